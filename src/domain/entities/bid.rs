//! # Bid Aggregate
//!
//! A buy proposal backed by a prepaid payment code.
//!
//! Bids expire lazily: nothing flips a flag when `expires_at` passes, so
//! callers must ask [`Bid::is_active_at`] on every read.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{
    AccountId, BidId, CheckedArithmetic, PaymentCode, Price, Quantity, ShareId, Timestamp,
};
use serde::{Deserialize, Serialize};

/// A buy proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    id: BidId,
    creator_id: AccountId,
    share_id: ShareId,
    amount: Quantity,
    price: Price,
    payment_code: PaymentCode,
    expires_at: Timestamp,
    removed: bool,
    created_at: Timestamp,
}

impl Bid {
    /// Creates a proposal that stays open until `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidQuantity` if `amount` is zero.
    pub fn new(
        creator_id: AccountId,
        share_id: ShareId,
        amount: Quantity,
        price: Price,
        payment_code: PaymentCode,
        expires_at: Timestamp,
    ) -> DomainResult<Self> {
        if !amount.is_positive() {
            return Err(DomainError::InvalidQuantity(
                "bid amount must be positive".to_string(),
            ));
        }
        Ok(Self {
            id: BidId::new_v4(),
            creator_id,
            share_id,
            amount,
            price,
            payment_code,
            expires_at,
            removed: false,
            created_at: Timestamp::now(),
        })
    }

    /// Reconstructs a bid from storage.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: BidId,
        creator_id: AccountId,
        share_id: ShareId,
        amount: Quantity,
        price: Price,
        payment_code: PaymentCode,
        expires_at: Timestamp,
        removed: bool,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            creator_id,
            share_id,
            amount,
            price,
            payment_code,
            expires_at,
            removed,
            created_at,
        }
    }

    /// True if the bid is past its expiry at `now`.
    #[inline]
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        !now.is_before(&self.expires_at)
    }

    /// True if the bid can still be taken at `now`.
    #[inline]
    #[must_use]
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        !self.removed && !self.is_expired_at(now)
    }

    /// Takes `amount` off the proposal.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InsufficientQuantity` if less than `amount` is left.
    pub fn reserve(&mut self, amount: Quantity) -> DomainResult<()> {
        self.amount = self
            .amount
            .safe_sub(amount)
            .map_err(|_| DomainError::InsufficientQuantity {
                requested: amount,
                available: self.amount,
            })?;
        Ok(())
    }

    /// Puts `amount` back on the proposal.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Overflow` on overflow.
    pub fn release(&mut self, amount: Quantity) -> DomainResult<()> {
        self.amount = self.amount.safe_add(amount)?;
        Ok(())
    }

    /// Soft-deletes the proposal.
    pub fn remove(&mut self) {
        self.removed = true;
    }

    /// Bid ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> BidId {
        self.id
    }

    /// Buying account.
    #[inline]
    #[must_use]
    pub fn creator_id(&self) -> AccountId {
        self.creator_id
    }

    /// Wanted share.
    #[inline]
    #[must_use]
    pub fn share_id(&self) -> ShareId {
        self.share_id
    }

    /// Shares still wanted.
    #[inline]
    #[must_use]
    pub fn amount(&self) -> Quantity {
        self.amount
    }

    /// Offered price per share.
    #[inline]
    #[must_use]
    pub fn price(&self) -> Price {
        self.price
    }

    /// Prepaid code redeemed on settlement.
    #[inline]
    #[must_use]
    pub fn payment_code(&self) -> &PaymentCode {
        &self.payment_code
    }

    /// Expiry instant.
    #[inline]
    #[must_use]
    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// True once soft-deleted.
    #[inline]
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Creation time.
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }
}
