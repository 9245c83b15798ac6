//! # Ask Aggregate
//!
//! A sale listing: shares an owner has sent to market.
//!
//! The remaining `amount` is decremented by each reservation and restored
//! by compensation. A listing is never physically deleted; `removed` is a
//! soft delete that every read path checks.

use crate::domain::entities::share::Share;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{
    AccountId, AskId, CheckedArithmetic, Price, Quantity, ShareId, Timestamp,
};
use serde::{Deserialize, Serialize};

/// A sale listing.
///
/// # Examples
///
/// ```
/// use share_ledger::domain::entities::ask::Ask;
/// use share_ledger::domain::entities::share::Share;
/// use share_ledger::domain::value_objects::{AccountId, Price, Quantity, ShareId};
///
/// let issuer = AccountId::new_v4();
/// let share = Share::new(issuer, "acme", "Acme", Price::from_units(12).unwrap()).unwrap();
///
/// let market = Ask::new(issuer, share.id(), Quantity::new(10), None).unwrap();
/// assert_eq!(market.effective_price(&share), Price::from_units(12).unwrap());
///
/// let fixed = Ask::new(issuer, share.id(), Quantity::new(10), Some(Price::from_units(9).unwrap())).unwrap();
/// assert_eq!(fixed.effective_price(&share), Price::from_units(9).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ask {
    id: AskId,
    owner_id: AccountId,
    share_id: ShareId,
    amount: Quantity,
    use_market_price: bool,
    fixed_price: Option<Price>,
    removed: bool,
    created_at: Timestamp,
}

impl Ask {
    /// Lists `amount` shares. `fixed_price = None` sells at market price.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidQuantity` if `amount` is zero.
    pub fn new(
        owner_id: AccountId,
        share_id: ShareId,
        amount: Quantity,
        fixed_price: Option<Price>,
    ) -> DomainResult<Self> {
        if !amount.is_positive() {
            return Err(DomainError::InvalidQuantity(
                "listed amount must be positive".to_string(),
            ));
        }
        Ok(Self {
            id: AskId::new_v4(),
            owner_id,
            share_id,
            amount,
            use_market_price: fixed_price.is_none(),
            fixed_price,
            removed: false,
            created_at: Timestamp::now(),
        })
    }

    /// Reconstructs an ask from storage.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: AskId,
        owner_id: AccountId,
        share_id: ShareId,
        amount: Quantity,
        use_market_price: bool,
        fixed_price: Option<Price>,
        removed: bool,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            owner_id,
            share_id,
            amount,
            use_market_price,
            fixed_price,
            removed,
            created_at,
        }
    }

    /// Price a buyer pays right now.
    ///
    /// The fixed price when one is set and the ask is not market-priced,
    /// otherwise the share's current price.
    #[must_use]
    pub fn effective_price(&self, share: &Share) -> Price {
        match self.fixed_price {
            Some(price) if !self.use_market_price => price,
            _ => share.price(),
        }
    }

    /// Takes `amount` off the listing. May reach exactly zero.
    ///
    /// # Errors
    ///
    /// - `DomainError::AlreadyRemoved` if the listing was removed
    /// - `DomainError::InsufficientQuantity` if less than `amount` is left
    pub fn reserve(&mut self, amount: Quantity) -> DomainResult<()> {
        if self.removed {
            return Err(DomainError::AlreadyRemoved(format!("ask {}", self.id)));
        }
        self.amount = self
            .amount
            .safe_sub(amount)
            .map_err(|_| DomainError::InsufficientQuantity {
                requested: amount,
                available: self.amount,
            })?;
        Ok(())
    }

    /// Puts `amount` back on the listing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Overflow` on overflow.
    pub fn release(&mut self, amount: Quantity) -> DomainResult<()> {
        self.amount = self.amount.safe_add(amount)?;
        Ok(())
    }

    /// Soft-deletes the listing.
    pub fn remove(&mut self) {
        self.removed = true;
    }

    /// Ask ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> AskId {
        self.id
    }

    /// Selling account.
    #[inline]
    #[must_use]
    pub fn owner_id(&self) -> AccountId {
        self.owner_id
    }

    /// Listed share.
    #[inline]
    #[must_use]
    pub fn share_id(&self) -> ShareId {
        self.share_id
    }

    /// Shares still available on the listing.
    #[inline]
    #[must_use]
    pub fn amount(&self) -> Quantity {
        self.amount
    }

    /// True if the ask follows the share's market price.
    #[inline]
    #[must_use]
    pub fn uses_market_price(&self) -> bool {
        self.use_market_price
    }

    /// Fixed price, if any.
    #[inline]
    #[must_use]
    pub fn fixed_price(&self) -> Option<Price> {
        self.fixed_price
    }

    /// True once soft-deleted.
    #[inline]
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Listing time.
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }
}
