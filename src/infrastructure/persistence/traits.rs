//! # Ledger Store Port
//!
//! Transactional port over the relational ledger state.
//!
//! Every mutation of an ask, bid, ownership or operation happens inside a
//! [`LedgerTransaction`] obtained from [`LedgerStore::begin`]. The `lock_*`
//! methods take an exclusive row lock (the equivalent of
//! `SELECT ... FOR NO KEY UPDATE`) that is held until commit or rollback,
//! which totally orders concurrent mutations of the same row. A
//! `RepeatableRead` transaction keeps its first snapshot after waiting on
//! a lock, so checks that aggregate other rows must lock a row that every
//! competing writer also writes (see [`LedgerTransaction::lock_ownership`]).
//!
//! A transaction that is dropped without `commit` is rolled back.

use crate::domain::entities::{Account, Ask, Bid, Operation, Ownership, Share};
use crate::domain::value_objects::{
    AccountId, AskId, BidId, CardNumber, IsolationLevel, OperationId, OperationStatus, Quantity,
    ShareId, Timestamp,
};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Error type for ledger store operations.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// A row the caller required does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// Identifier looked up.
        id: String,
    },

    /// Unique constraint violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store aborted the transaction because of a concurrent writer.
    #[error("concurrent update: {0}")]
    ConcurrentUpdate(String),

    /// Could not reach the store.
    #[error("connection error: {0}")]
    Connection(String),

    /// Statement failed.
    #[error("query error: {0}")]
    Query(String),

    /// Row could not be mapped to or from a domain type.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl RepositoryError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Creates a concurrent-update error.
    #[must_use]
    pub fn concurrent_update(msg: impl Into<String>) -> Self {
        Self::ConcurrentUpdate(msg.into())
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error.
    #[must_use]
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

/// Result type for ledger store operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Factory for ledger transactions.
#[async_trait]
pub trait LedgerStore: Send + Sync + fmt::Debug {
    /// Opens a transaction at the given isolation level.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Connection` if no connection is available.
    async fn begin(&self, isolation: IsolationLevel) -> RepositoryResult<Box<dyn LedgerTransaction>>;
}

/// One open ledger transaction.
///
/// Methods named `lock_*` acquire an exclusive row lock; `find_*` methods
/// read without locking.
#[async_trait]
pub trait LedgerTransaction: Send {
    // ========== Accounts ==========

    /// Reads an account.
    async fn find_account(&mut self, id: AccountId) -> RepositoryResult<Option<Account>>;

    /// Reads and locks an account.
    async fn lock_account(&mut self, id: AccountId) -> RepositoryResult<Option<Account>>;

    /// Finds the account with this email.
    async fn find_account_by_email(&mut self, email: &str) -> RepositoryResult<Option<Account>>;

    /// Finds the account holding this card number.
    async fn find_account_by_card(
        &mut self,
        card_number: &CardNumber,
    ) -> RepositoryResult<Option<Account>>;

    /// Inserts a new account.
    async fn insert_account(&mut self, account: &Account) -> RepositoryResult<()>;

    /// Persists card and activation changes.
    async fn update_account(&mut self, account: &Account) -> RepositoryResult<()>;

    // ========== Shares ==========

    /// Reads a share.
    async fn find_share(&mut self, id: ShareId) -> RepositoryResult<Option<Share>>;

    /// Reads and locks a share.
    async fn lock_share(&mut self, id: ShareId) -> RepositoryResult<Option<Share>>;

    /// Finds a share by lower-case ticker.
    async fn find_share_by_ticker(&mut self, ticker: &str) -> RepositoryResult<Option<Share>>;

    /// Inserts a new share.
    async fn insert_share(&mut self, share: &Share) -> RepositoryResult<()>;

    /// Persists a price change.
    async fn update_share(&mut self, share: &Share) -> RepositoryResult<()>;

    // ========== Ownership ==========

    /// Reads and locks a balance row.
    ///
    /// The lock is a write: under `RepeatableRead`, a change to the row
    /// committed after this transaction's snapshot fails the call with
    /// `ConcurrentUpdate`, so checks derived from the balance never act on
    /// a stale view of the seller's commitments.
    async fn lock_ownership(
        &mut self,
        account_id: AccountId,
        share_id: ShareId,
    ) -> RepositoryResult<Option<Ownership>>;

    /// Persists a locked balance row.
    async fn update_ownership(&mut self, ownership: &Ownership) -> RepositoryResult<()>;

    /// Atomically adds `amount` to a balance, creating the row if missing.
    async fn credit_ownership(
        &mut self,
        account_id: AccountId,
        share_id: ShareId,
        amount: Quantity,
    ) -> RepositoryResult<Ownership>;

    /// Sum of remaining amounts on the account's open asks for a share.
    async fn sum_listed_amount(
        &mut self,
        share_id: ShareId,
        owner_id: AccountId,
    ) -> RepositoryResult<Quantity>;

    // ========== Asks ==========

    /// Reads an ask without locking it, including removed ones.
    async fn find_ask(&mut self, id: AskId) -> RepositoryResult<Option<Ask>>;

    /// Reads and locks an ask, including removed ones.
    async fn lock_ask(&mut self, id: AskId) -> RepositoryResult<Option<Ask>>;

    /// Inserts a new ask.
    async fn insert_ask(&mut self, ask: &Ask) -> RepositoryResult<()>;

    /// Persists amount and removal changes.
    async fn update_ask(&mut self, ask: &Ask) -> RepositoryResult<()>;

    // ========== Bids ==========

    /// Reads and locks a bid, including removed and expired ones.
    async fn lock_bid(&mut self, id: BidId) -> RepositoryResult<Option<Bid>>;

    /// Inserts a new bid.
    async fn insert_bid(&mut self, bid: &Bid) -> RepositoryResult<()>;

    /// Persists amount and removal changes.
    async fn update_bid(&mut self, bid: &Bid) -> RepositoryResult<()>;

    /// Number of the account's bids that are neither removed nor expired at `now`.
    async fn count_active_bids(
        &mut self,
        creator_id: AccountId,
        now: Timestamp,
    ) -> RepositoryResult<u64>;

    // ========== Operations ==========

    /// Reads an operation, locking it if `for_update`.
    async fn find_operation(
        &mut self,
        id: OperationId,
        for_update: bool,
    ) -> RepositoryResult<Option<Operation>>;

    /// Inserts a new operation.
    async fn insert_operation(&mut self, operation: &Operation) -> RepositoryResult<()>;

    /// Persists a status change.
    async fn update_operation_status(
        &mut self,
        id: OperationId,
        status: OperationStatus,
    ) -> RepositoryResult<()>;

    /// Sum of amounts of pending operations where `seller_id` sells `share_id`.
    async fn sum_pending_amount(
        &mut self,
        share_id: ShareId,
        seller_id: AccountId,
    ) -> RepositoryResult<Quantity>;

    /// Pending operations created before `cutoff`, oldest first.
    async fn find_pending_created_before(
        &mut self,
        cutoff: Timestamp,
    ) -> RepositoryResult<Vec<Operation>>;

    // ========== Completion ==========

    /// Makes every change visible and releases all locks.
    async fn commit(self: Box<Self>) -> RepositoryResult<()>;

    /// Discards every change and releases all locks.
    async fn rollback(self: Box<Self>) -> RepositoryResult<()>;
}
