//! # Share Entity
//!
//! A security issued by a company account.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{AccountId, Price, ShareId};
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_TICKER_LEN: usize = 12;

/// An issued share with its current market price.
///
/// # Invariants
///
/// - Ticker is non-empty, lower-case ASCII alphanumeric
/// - Price is strictly positive (guaranteed by [`Price`])
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    id: ShareId,
    issuer_id: AccountId,
    ticker: String,
    name: String,
    price: Price,
}

impl Share {
    /// Creates a new share, normalizing the ticker to lower case.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTicker` if the ticker is empty, too long,
    /// or contains anything but ASCII letters and digits.
    pub fn new(
        issuer_id: AccountId,
        ticker: &str,
        name: impl Into<String>,
        price: Price,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: ShareId::new_v4(),
            issuer_id,
            ticker: Self::normalize_ticker(ticker)?,
            name: name.into(),
            price,
        })
    }

    /// Reconstructs a share from storage.
    #[must_use]
    pub fn from_parts(
        id: ShareId,
        issuer_id: AccountId,
        ticker: String,
        name: String,
        price: Price,
    ) -> Self {
        Self {
            id,
            issuer_id,
            ticker,
            name,
            price,
        }
    }

    /// Validates a ticker and returns its canonical lower-case form.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTicker` for malformed input.
    pub fn normalize_ticker(ticker: &str) -> DomainResult<String> {
        let ticker = ticker.trim();
        if ticker.is_empty() || ticker.len() > MAX_TICKER_LEN {
            return Err(DomainError::InvalidTicker(format!(
                "ticker must be 1 to {MAX_TICKER_LEN} characters"
            )));
        }
        if !ticker.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(DomainError::InvalidTicker(
                "ticker must be alphanumeric".to_string(),
            ));
        }
        Ok(ticker.to_ascii_lowercase())
    }

    /// Sets a new market price.
    pub fn update_price(&mut self, price: Price) {
        self.price = price;
    }

    /// True if `account` issued this share.
    #[inline]
    #[must_use]
    pub fn is_issued_by(&self, account: AccountId) -> bool {
        self.issuer_id == account
    }

    /// Share ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ShareId {
        self.id
    }

    /// Issuing account.
    #[inline]
    #[must_use]
    pub fn issuer_id(&self) -> AccountId {
        self.issuer_id
    }

    /// Lower-case ticker.
    #[inline]
    #[must_use]
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Display name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current market price.
    #[inline]
    #[must_use]
    pub fn price(&self) -> Price {
        self.price
    }
}

impl fmt::Display for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.ticker, self.price)
    }
}
