//! # Payment Value Objects
//!
//! Card numbers, buyer payment cards and prepaid payment codes.
//!
//! These values travel to the external payment processor and are never
//! written to logs in clear: their `Debug` output is redacted.

use crate::domain::errors::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A bank card number (PAN): 12 to 19 ASCII digits.
///
/// # Examples
///
/// ```
/// use share_ledger::domain::value_objects::payment::CardNumber;
///
/// let card = CardNumber::new("4111111111111111").unwrap();
/// assert_eq!(format!("{card:?}"), "CardNumber(****1111)");
/// assert!(CardNumber::new("4111-1111").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardNumber(String);

impl CardNumber {
    /// Validates and wraps a card number.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCardNumber` unless the value is 12-19 digits.
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        let len_ok = (12..=19).contains(&value.len());
        if !len_ok || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::InvalidCardNumber(
                "card number must be 12 to 19 digits".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Returns the raw card number.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last four digits, for logs.
    #[must_use]
    pub fn last_four(&self) -> &str {
        &self.0[self.0.len() - 4..]
    }
}

impl fmt::Debug for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CardNumber(****{})", self.last_four())
    }
}

impl TryFrom<String> for CardNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CardNumber> for String {
    fn from(card: CardNumber) -> Self {
        card.0
    }
}

/// Card details a buyer supplies to pay for an ask.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCard {
    card_number: CardNumber,
    cvv: String,
    expiration_month: u8,
    expiration_year: u16,
}

impl PaymentCard {
    /// Validates and builds a payment card.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPaymentCard` if the CVV is not 3-4 digits
    /// or the month is outside 1-12.
    pub fn new(
        card_number: CardNumber,
        cvv: impl Into<String>,
        expiration_month: u8,
        expiration_year: u16,
    ) -> DomainResult<Self> {
        let cvv = cvv.into();
        if !(3..=4).contains(&cvv.len()) || !cvv.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::InvalidPaymentCard(
                "cvv must be 3 or 4 digits".to_string(),
            ));
        }
        if !(1..=12).contains(&expiration_month) {
            return Err(DomainError::InvalidPaymentCard(
                "expiration month must be 1-12".to_string(),
            ));
        }
        Ok(Self {
            card_number,
            cvv,
            expiration_month,
            expiration_year,
        })
    }

    /// Card number being charged.
    #[inline]
    #[must_use]
    pub fn card_number(&self) -> &CardNumber {
        &self.card_number
    }

    /// Card verification value.
    #[inline]
    #[must_use]
    pub fn cvv(&self) -> &str {
        &self.cvv
    }

    /// Expiration month (1-12).
    #[inline]
    #[must_use]
    pub fn expiration_month(&self) -> u8 {
        self.expiration_month
    }

    /// Expiration year.
    #[inline]
    #[must_use]
    pub fn expiration_year(&self) -> u16 {
        self.expiration_year
    }
}

impl fmt::Debug for PaymentCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentCard")
            .field("card_number", &self.card_number)
            .field("cvv", &"***")
            .field("expiration_month", &self.expiration_month)
            .field("expiration_year", &self.expiration_year)
            .finish()
    }
}

/// Prepaid payment code attached to a bid; redeemed when a seller takes it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentCode(String);

impl PaymentCode {
    /// Wraps a non-empty payment code.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPaymentCode` if the code is blank.
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::InvalidPaymentCode(
                "payment code cannot be empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Returns the raw code.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PaymentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PaymentCode(***)")
    }
}

impl TryFrom<String> for PaymentCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PaymentCode> for String {
    fn from(code: PaymentCode) -> Self {
        code.0
    }
}
