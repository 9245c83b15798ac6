//! # Operation Aggregate
//!
//! Trade record created when inventory is reserved and finalized by the
//! asynchronous settlement verdict.
//!
//! # Examples
//!
//! ```
//! use share_ledger::domain::entities::operation::{Operation, OperationOrigin};
//! use share_ledger::domain::value_objects::{
//!     AccountId, AskId, OperationStatus, Price, Quantity, ShareId,
//! };
//!
//! let mut operation = Operation::new(
//!     AccountId::new_v4(),
//!     AccountId::new_v4(),
//!     ShareId::new_v4(),
//!     OperationOrigin::Ask(AskId::new_v4()),
//!     Price::from_units(10).unwrap(),
//!     Quantity::new(30),
//! )
//! .unwrap();
//!
//! assert!(operation.is_pending());
//! operation.transition_to(OperationStatus::Succeed).unwrap();
//! assert!(operation.transition_to(OperationStatus::Rejected).is_err());
//! ```

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{
    AccountId, AskId, BidId, OperationId, OperationStatus, Price, Quantity, ShareId, Timestamp,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an operation reserved inventory from.
///
/// Compensation releases the reserved amount back to exactly this source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum OperationOrigin {
    /// A buyer bought from a sale listing.
    Ask(AskId),
    /// A seller fulfilled a buy proposal.
    Bid(BidId),
}

impl OperationOrigin {
    /// The ask id, if the operation came from an ask.
    #[must_use]
    pub const fn ask_id(&self) -> Option<AskId> {
        match self {
            Self::Ask(id) => Some(*id),
            Self::Bid(_) => None,
        }
    }

    /// The bid id, if the operation came from a bid.
    #[must_use]
    pub const fn bid_id(&self) -> Option<BidId> {
        match self {
            Self::Bid(id) => Some(*id),
            Self::Ask(_) => None,
        }
    }
}

impl fmt::Display for OperationOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ask(id) => write!(f, "ask:{id}"),
            Self::Bid(id) => write!(f, "bid:{id}"),
        }
    }
}

/// A trade between a seller and a buyer for one share.
///
/// # Invariants
///
/// - `amount > 0` and `price > 0`
/// - Status moves only `PendingPayment → Succeed | Rejected`, once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    id: OperationId,
    seller_id: AccountId,
    buyer_id: AccountId,
    share_id: ShareId,
    origin: OperationOrigin,
    price: Price,
    amount: Quantity,
    status: OperationStatus,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Operation {
    /// Creates a pending operation.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidQuantity` if `amount` is zero.
    pub fn new(
        seller_id: AccountId,
        buyer_id: AccountId,
        share_id: ShareId,
        origin: OperationOrigin,
        price: Price,
        amount: Quantity,
    ) -> DomainResult<Self> {
        if !amount.is_positive() {
            return Err(DomainError::InvalidQuantity(
                "operation amount must be positive".to_string(),
            ));
        }
        let now = Timestamp::now();
        Ok(Self {
            id: OperationId::new_v4(),
            seller_id,
            buyer_id,
            share_id,
            origin,
            price,
            amount,
            status: OperationStatus::PendingPayment,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstructs an operation from storage.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: OperationId,
        seller_id: AccountId,
        buyer_id: AccountId,
        share_id: ShareId,
        origin: OperationOrigin,
        price: Price,
        amount: Quantity,
        status: OperationStatus,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            seller_id,
            buyer_id,
            share_id,
            origin,
            price,
            amount,
            status,
            created_at,
            updated_at,
        }
    }

    /// Moves the operation to `target`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` if the state machine
    /// forbids the move.
    pub fn transition_to(&mut self, target: OperationStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(target) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    // ========== Accessors ==========

    /// Returns the operation ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// Account giving up the shares.
    #[inline]
    #[must_use]
    pub fn seller_id(&self) -> AccountId {
        self.seller_id
    }

    /// Account receiving the shares.
    #[inline]
    #[must_use]
    pub fn buyer_id(&self) -> AccountId {
        self.buyer_id
    }

    /// Share being traded.
    #[inline]
    #[must_use]
    pub fn share_id(&self) -> ShareId {
        self.share_id
    }

    /// Listing or proposal the amount was reserved from.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> OperationOrigin {
        self.origin
    }

    /// Price per share.
    #[inline]
    #[must_use]
    pub fn price(&self) -> Price {
        self.price
    }

    /// Number of shares traded.
    #[inline]
    #[must_use]
    pub fn amount(&self) -> Quantity {
        self.amount
    }

    /// Current status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> OperationStatus {
        self.status
    }

    /// Creation time.
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Time of the last status change.
    #[inline]
    #[must_use]
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// True while awaiting the settlement verdict.
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    /// Money owed: `amount × price`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Overflow` if the total is not representable.
    pub fn total(&self) -> DomainResult<Decimal> {
        Ok(self.price.total_for(self.amount)?)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Operation({} {} x {} @ {} [{}])",
            self.id, self.share_id, self.amount, self.price, self.status
        )
    }
}
