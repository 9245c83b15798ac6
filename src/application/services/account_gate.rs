//! # Account Gate
//!
//! Read-only view of accounts used as a trading precondition.
//!
//! The gate opens its own short transaction, so it must be consulted
//! before the caller begins a ledger transaction, never inside one.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::domain::entities::Account;
use crate::domain::value_objects::{AccountId, IsolationLevel};
use crate::infrastructure::persistence::traits::LedgerStore;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Account lookup and activation check.
#[async_trait]
pub trait AccountGate: Send + Sync + fmt::Debug {
    /// Loads an account.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist.
    async fn get_account(&self, id: AccountId) -> ApplicationResult<Account>;

    /// True if the account may trade.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist.
    async fn is_activated(&self, id: AccountId) -> ApplicationResult<bool> {
        Ok(self.get_account(id).await?.is_activated())
    }
}

/// [`AccountGate`] backed by the ledger store.
#[derive(Debug, Clone)]
pub struct StoreAccountGate {
    store: Arc<dyn LedgerStore>,
}

impl StoreAccountGate {
    /// Creates a gate over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AccountGate for StoreAccountGate {
    async fn get_account(&self, id: AccountId) -> ApplicationResult<Account> {
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let account = tx.find_account(id).await;
        tx.rollback().await?;
        account?.ok_or_else(|| ApplicationError::not_found("account", id))
    }
}
