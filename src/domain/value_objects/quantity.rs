//! # Quantity Value Object
//!
//! Whole-share quantity with checked arithmetic.
//!
//! Shares are indivisible, so a [`Quantity`] is a non-negative integer.
//! Every balance in the ledger (ownership, remaining ask/bid amount,
//! operation amount) is expressed with it.
//!
//! # Examples
//!
//! ```
//! use share_ledger::domain::value_objects::arithmetic::CheckedArithmetic;
//! use share_ledger::domain::value_objects::quantity::Quantity;
//!
//! let listed = Quantity::new(100);
//! let sold = Quantity::new(30);
//!
//! let left = listed.safe_sub(sold).unwrap();
//! assert_eq!(left.get(), 70);
//! assert!(sold.safe_sub(listed).is_err());
//! ```

use super::arithmetic::{ArithmeticError, ArithmeticResult, CheckedArithmetic};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-negative number of shares.
///
/// # Invariants
///
/// - Quantity is always >= 0 (enforced by the unsigned representation)
/// - Arithmetic never wraps; see [`CheckedArithmetic`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u64);

impl Quantity {
    /// Zero quantity constant.
    pub const ZERO: Self = Self(0);

    /// Creates a quantity from a share count.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns a zero quantity.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::ZERO
    }

    /// Returns the inner share count.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns true if the quantity is zero.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the quantity is strictly positive.
    #[inline]
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Subtracts `rhs`, clamping at zero.
    ///
    /// Only used for reporting how much is still available; balance
    /// mutations go through [`CheckedArithmetic::safe_sub`].
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl CheckedArithmetic for Quantity {
    fn safe_add(self, rhs: Self) -> ArithmeticResult<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(ArithmeticError::Overflow)
    }

    fn safe_sub(self, rhs: Self) -> ArithmeticResult<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(ArithmeticError::Underflow)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Quantity {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Conversion from a signed storage column.
impl TryFrom<i64> for Quantity {
    type Error = ArithmeticError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| ArithmeticError::InvalidValue("quantity cannot be negative"))
    }
}

/// Conversion into a signed storage column.
impl TryFrom<Quantity> for i64 {
    type Error = ArithmeticError;

    fn try_from(value: Quantity) -> Result<Self, Self::Error> {
        i64::try_from(value.0).map_err(|_| ArithmeticError::Overflow)
    }
}
