//! # Price Value Object
//!
//! Strictly positive decimal price per share.
//!
//! This module provides the [`Price`] type, a wrapper around [`Decimal`]
//! used for share prices, fixed ask prices and bid prices. A price of zero
//! is never valid in this ledger.
//!
//! # Examples
//!
//! ```
//! use rust_decimal::Decimal;
//! use share_ledger::domain::value_objects::price::Price;
//! use share_ledger::domain::value_objects::quantity::Quantity;
//!
//! let price = Price::new(Decimal::new(1050, 2)).unwrap();
//! let total = price.total_for(Quantity::new(3)).unwrap();
//! assert_eq!(total, Decimal::new(3150, 2));
//!
//! assert!(Price::new(Decimal::ZERO).is_err());
//! ```

use super::arithmetic::{ArithmeticError, ArithmeticResult};
use super::quantity::Quantity;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated, strictly positive price.
///
/// # Invariants
///
/// - Price is always > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Creates a new price.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticError::InvalidValue` if the value is zero or negative.
    pub fn new(value: Decimal) -> ArithmeticResult<Self> {
        if value <= Decimal::ZERO {
            return Err(ArithmeticError::InvalidValue("price must be positive"));
        }
        Ok(Self(value))
    }

    /// Creates a price from a whole number of currency units.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticError::InvalidValue` if `units` is zero.
    pub fn from_units(units: u64) -> ArithmeticResult<Self> {
        Self::new(Decimal::from(units))
    }

    /// Returns the inner decimal value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> Decimal {
        self.0
    }

    /// Total money owed for `amount` shares at this price.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticError::Overflow` if the product is not representable.
    pub fn total_for(self, amount: Quantity) -> ArithmeticResult<Decimal> {
        self.0
            .checked_mul(Decimal::from(amount.get()))
            .ok_or(ArithmeticError::Overflow)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = ArithmeticError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    #[inline]
    fn from(price: Price) -> Self {
        price.0
    }
}

impl FromStr for Price {
    type Err = ArithmeticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s).map_err(|_| ArithmeticError::InvalidValue("not a decimal"))?;
        Self::new(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod construction {
        use super::*;

        #[test]
        fn positive_is_accepted() {
            let price = Price::new(Decimal::new(1, 2)).unwrap();
            assert_eq!(price.get(), Decimal::new(1, 2));
        }

        #[test]
        fn zero_is_rejected() {
            assert!(Price::new(Decimal::ZERO).is_err());
            assert!(Price::from_units(0).is_err());
        }

        #[test]
        fn negative_is_rejected() {
            assert!(Price::new(Decimal::new(-5, 0)).is_err());
        }

        #[test]
        fn parses_from_str() {
            assert_eq!("12.5".parse::<Price>().unwrap().get(), Decimal::new(125, 1));
            assert!("abc".parse::<Price>().is_err());
            assert!("0".parse::<Price>().is_err());
        }
    }

    mod totals {
        use super::*;

        #[test]
        fn total_is_amount_times_price() {
            let price = Price::from_units(10).unwrap();
            assert_eq!(
                price.total_for(Quantity::new(30)).unwrap(),
                Decimal::from(300)
            );
        }

        #[test]
        fn total_of_zero_shares_is_zero() {
            let price = Price::from_units(10).unwrap();
            assert_eq!(price.total_for(Quantity::ZERO).unwrap(), Decimal::ZERO);
        }

        #[test]
        fn overflow_is_reported() {
            let price = Price::new(Decimal::MAX).unwrap();
            assert_eq!(
                price.total_for(Quantity::new(2)),
                Err(ArithmeticError::Overflow)
            );
        }
    }

    mod serde_format {
        use super::*;

        #[test]
        fn deserialization_rejects_zero() {
            let result: Result<Price, _> = serde_json::from_str("\"0\"");
            assert!(result.is_err());
        }
    }
}
