//! # In-Memory Ledger Store
//!
//! In-memory implementation of [`LedgerStore`] for tests and local runs.
//!
//! A transaction takes an owned lock on the whole state and works on a
//! copy of it. Commit swaps the copy in; rollback (or drop) discards it.
//! Transactions are therefore fully serialized and `lock_*` behaves like
//! `find_*`.

use crate::domain::entities::{Account, Ask, Bid, Operation, Ownership, Share};
use crate::domain::value_objects::{
    AccountId, AskId, BidId, CardNumber, CheckedArithmetic, IsolationLevel, OperationId,
    OperationStatus, Quantity, ShareId, Timestamp,
};
use crate::infrastructure::persistence::traits::{
    LedgerStore, LedgerTransaction, RepositoryError, RepositoryResult,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    shares: HashMap<ShareId, Share>,
    ownerships: HashMap<(AccountId, ShareId), Ownership>,
    asks: HashMap<AskId, Ask>,
    bids: HashMap<BidId, Bid>,
    operations: HashMap<OperationId, Operation>,
}

/// In-memory implementation of [`LedgerStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed view of an account.
    pub async fn account(&self, id: AccountId) -> Option<Account> {
        self.state.lock().await.accounts.get(&id).cloned()
    }

    /// Committed view of an ask.
    pub async fn ask(&self, id: AskId) -> Option<Ask> {
        self.state.lock().await.asks.get(&id).cloned()
    }

    /// Committed view of a bid.
    pub async fn bid(&self, id: BidId) -> Option<Bid> {
        self.state.lock().await.bids.get(&id).cloned()
    }

    /// Committed view of an operation.
    pub async fn operation(&self, id: OperationId) -> Option<Operation> {
        self.state.lock().await.operations.get(&id).cloned()
    }

    /// Number of committed operations.
    pub async fn operation_count(&self) -> usize {
        self.state.lock().await.operations.len()
    }

    /// Committed balance, zero if the row does not exist.
    pub async fn ownership_amount(&self, account_id: AccountId, share_id: ShareId) -> Quantity {
        self.state
            .lock()
            .await
            .ownerships
            .get(&(account_id, share_id))
            .map_or(Quantity::ZERO, Ownership::amount)
    }

    /// Sum of every committed balance for a share.
    pub async fn total_owned(&self, share_id: ShareId) -> u64 {
        self.state
            .lock()
            .await
            .ownerships
            .values()
            .filter(|o| o.share_id() == share_id)
            .map(|o| o.amount().get())
            .sum()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self, _isolation: IsolationLevel) -> RepositoryResult<Box<dyn LedgerTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, working }))
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
}

impl InMemoryTransaction {
    fn listed_amount(&self, share_id: ShareId, owner_id: AccountId) -> RepositoryResult<Quantity> {
        self.working
            .asks
            .values()
            .filter(|a| !a.is_removed() && a.share_id() == share_id && a.owner_id() == owner_id)
            .try_fold(Quantity::ZERO, |acc, a| acc.safe_add(a.amount()))
            .map_err(|e| RepositoryError::serialization(e.to_string()))
    }
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn find_account(&mut self, id: AccountId) -> RepositoryResult<Option<Account>> {
        Ok(self.working.accounts.get(&id).cloned())
    }

    async fn lock_account(&mut self, id: AccountId) -> RepositoryResult<Option<Account>> {
        Ok(self.working.accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&mut self, email: &str) -> RepositoryResult<Option<Account>> {
        Ok(self
            .working
            .accounts
            .values()
            .find(|a| a.email() == email)
            .cloned())
    }

    async fn find_account_by_card(
        &mut self,
        card_number: &CardNumber,
    ) -> RepositoryResult<Option<Account>> {
        Ok(self
            .working
            .accounts
            .values()
            .find(|a| a.card_number() == Some(card_number))
            .cloned())
    }

    async fn insert_account(&mut self, account: &Account) -> RepositoryResult<()> {
        if self.working.accounts.contains_key(&account.id()) {
            return Err(RepositoryError::conflict(format!(
                "account {} already exists",
                account.id()
            )));
        }
        if self
            .working
            .accounts
            .values()
            .any(|a| a.email() == account.email())
        {
            return Err(RepositoryError::conflict("email already registered"));
        }
        self.working.accounts.insert(account.id(), account.clone());
        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> RepositoryResult<()> {
        match self.working.accounts.get_mut(&account.id()) {
            Some(existing) => {
                *existing = account.clone();
                Ok(())
            }
            None => Err(RepositoryError::not_found("account", account.id())),
        }
    }

    async fn find_share(&mut self, id: ShareId) -> RepositoryResult<Option<Share>> {
        Ok(self.working.shares.get(&id).cloned())
    }

    async fn lock_share(&mut self, id: ShareId) -> RepositoryResult<Option<Share>> {
        Ok(self.working.shares.get(&id).cloned())
    }

    async fn find_share_by_ticker(&mut self, ticker: &str) -> RepositoryResult<Option<Share>> {
        Ok(self
            .working
            .shares
            .values()
            .find(|s| s.ticker() == ticker)
            .cloned())
    }

    async fn insert_share(&mut self, share: &Share) -> RepositoryResult<()> {
        if self
            .working
            .shares
            .values()
            .any(|s| s.id() == share.id() || s.ticker() == share.ticker())
        {
            return Err(RepositoryError::conflict(format!(
                "share {} already exists",
                share.ticker()
            )));
        }
        self.working.shares.insert(share.id(), share.clone());
        Ok(())
    }

    async fn update_share(&mut self, share: &Share) -> RepositoryResult<()> {
        match self.working.shares.get_mut(&share.id()) {
            Some(existing) => {
                *existing = share.clone();
                Ok(())
            }
            None => Err(RepositoryError::not_found("share", share.id())),
        }
    }

    async fn lock_ownership(
        &mut self,
        account_id: AccountId,
        share_id: ShareId,
    ) -> RepositoryResult<Option<Ownership>> {
        Ok(self.working.ownerships.get(&(account_id, share_id)).cloned())
    }

    async fn update_ownership(&mut self, ownership: &Ownership) -> RepositoryResult<()> {
        let key = (ownership.account_id(), ownership.share_id());
        match self.working.ownerships.get_mut(&key) {
            Some(existing) => {
                *existing = ownership.clone();
                Ok(())
            }
            None => Err(RepositoryError::not_found(
                "ownership",
                format!("{}/{}", key.0, key.1),
            )),
        }
    }

    async fn credit_ownership(
        &mut self,
        account_id: AccountId,
        share_id: ShareId,
        amount: Quantity,
    ) -> RepositoryResult<Ownership> {
        let row = self
            .working
            .ownerships
            .entry((account_id, share_id))
            .or_insert_with(|| Ownership::new(account_id, share_id, Quantity::ZERO));
        row.credit(amount)
            .map_err(|e| RepositoryError::serialization(e.to_string()))?;
        Ok(row.clone())
    }

    async fn sum_listed_amount(
        &mut self,
        share_id: ShareId,
        owner_id: AccountId,
    ) -> RepositoryResult<Quantity> {
        self.listed_amount(share_id, owner_id)
    }

    async fn find_ask(&mut self, id: AskId) -> RepositoryResult<Option<Ask>> {
        Ok(self.working.asks.get(&id).cloned())
    }

    async fn lock_ask(&mut self, id: AskId) -> RepositoryResult<Option<Ask>> {
        Ok(self.working.asks.get(&id).cloned())
    }

    async fn insert_ask(&mut self, ask: &Ask) -> RepositoryResult<()> {
        if self.working.asks.insert(ask.id(), ask.clone()).is_some() {
            return Err(RepositoryError::conflict(format!("ask {} already exists", ask.id())));
        }
        Ok(())
    }

    async fn update_ask(&mut self, ask: &Ask) -> RepositoryResult<()> {
        match self.working.asks.get_mut(&ask.id()) {
            Some(existing) => {
                *existing = ask.clone();
                Ok(())
            }
            None => Err(RepositoryError::not_found("ask", ask.id())),
        }
    }

    async fn lock_bid(&mut self, id: BidId) -> RepositoryResult<Option<Bid>> {
        Ok(self.working.bids.get(&id).cloned())
    }

    async fn insert_bid(&mut self, bid: &Bid) -> RepositoryResult<()> {
        if self.working.bids.insert(bid.id(), bid.clone()).is_some() {
            return Err(RepositoryError::conflict(format!("bid {} already exists", bid.id())));
        }
        Ok(())
    }

    async fn update_bid(&mut self, bid: &Bid) -> RepositoryResult<()> {
        match self.working.bids.get_mut(&bid.id()) {
            Some(existing) => {
                *existing = bid.clone();
                Ok(())
            }
            None => Err(RepositoryError::not_found("bid", bid.id())),
        }
    }

    async fn count_active_bids(
        &mut self,
        creator_id: AccountId,
        now: Timestamp,
    ) -> RepositoryResult<u64> {
        let count = self
            .working
            .bids
            .values()
            .filter(|b| b.creator_id() == creator_id && b.is_active_at(now))
            .count();
        Ok(count as u64)
    }

    async fn find_operation(
        &mut self,
        id: OperationId,
        _for_update: bool,
    ) -> RepositoryResult<Option<Operation>> {
        Ok(self.working.operations.get(&id).cloned())
    }

    async fn insert_operation(&mut self, operation: &Operation) -> RepositoryResult<()> {
        if self
            .working
            .operations
            .insert(operation.id(), operation.clone())
            .is_some()
        {
            return Err(RepositoryError::conflict(format!(
                "operation {} already exists",
                operation.id()
            )));
        }
        Ok(())
    }

    async fn update_operation_status(
        &mut self,
        id: OperationId,
        status: OperationStatus,
    ) -> RepositoryResult<()> {
        let existing = self
            .working
            .operations
            .get(&id)
            .ok_or_else(|| RepositoryError::not_found("operation", id))?;
        let updated = Operation::from_parts(
            existing.id(),
            existing.seller_id(),
            existing.buyer_id(),
            existing.share_id(),
            existing.origin(),
            existing.price(),
            existing.amount(),
            status,
            existing.created_at(),
            Timestamp::now(),
        );
        self.working.operations.insert(id, updated);
        Ok(())
    }

    async fn sum_pending_amount(
        &mut self,
        share_id: ShareId,
        seller_id: AccountId,
    ) -> RepositoryResult<Quantity> {
        self.working
            .operations
            .values()
            .filter(|o| o.is_pending() && o.share_id() == share_id && o.seller_id() == seller_id)
            .try_fold(Quantity::ZERO, |acc, o| acc.safe_add(o.amount()))
            .map_err(|e| RepositoryError::serialization(e.to_string()))
    }

    async fn find_pending_created_before(
        &mut self,
        cutoff: Timestamp,
    ) -> RepositoryResult<Vec<Operation>> {
        let mut stale: Vec<Operation> = self
            .working
            .operations
            .values()
            .filter(|o| o.is_pending() && o.created_at().is_before(&cutoff))
            .cloned()
            .collect();
        stale.sort_by_key(Operation::created_at);
        Ok(stale)
    }

    async fn commit(self: Box<Self>) -> RepositoryResult<()> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepositoryResult<()> {
        Ok(())
    }
}
