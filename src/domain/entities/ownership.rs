//! # Ownership Entity
//!
//! Balance of one share held by one account.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{AccountId, CheckedArithmetic, Quantity, ShareId};
use serde::{Deserialize, Serialize};

/// Per (account, share) balance.
///
/// The amount can never go negative: [`debit`](Ownership::debit) refuses to
/// take more than is held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    account_id: AccountId,
    share_id: ShareId,
    amount: Quantity,
}

impl Ownership {
    /// Creates a balance row.
    #[must_use]
    pub const fn new(account_id: AccountId, share_id: ShareId, amount: Quantity) -> Self {
        Self {
            account_id,
            share_id,
            amount,
        }
    }

    /// Removes `amount` shares.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InsufficientQuantity` if the balance is too small.
    pub fn debit(&mut self, amount: Quantity) -> DomainResult<()> {
        self.amount = self
            .amount
            .safe_sub(amount)
            .map_err(|_| DomainError::InsufficientQuantity {
                requested: amount,
                available: self.amount,
            })?;
        Ok(())
    }

    /// Adds `amount` shares.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Overflow` if the balance would overflow.
    pub fn credit(&mut self, amount: Quantity) -> DomainResult<()> {
        self.amount = self.amount.safe_add(amount)?;
        Ok(())
    }

    /// Owning account.
    #[inline]
    #[must_use]
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Owned share.
    #[inline]
    #[must_use]
    pub fn share_id(&self) -> ShareId {
        self.share_id
    }

    /// Shares held.
    #[inline]
    #[must_use]
    pub fn amount(&self) -> Quantity {
        self.amount
    }
}
