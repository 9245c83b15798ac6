//! # Listings
//!
//! Asks (shares put on the market) and bids (buy proposals backed by a
//! prepaid code).

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::{OperationLedger, finish, retry_on_conflict};
use crate::domain::entities::{Ask, Bid};
use crate::domain::errors::DomainError;
use crate::domain::value_objects::{
    AccountId, AskId, BidId, CheckedArithmetic, IsolationLevel, PaymentCode, Price, Quantity,
    ShareId, Timestamp,
};
use crate::infrastructure::persistence::traits::{LedgerStore, LedgerTransaction};
use std::sync::Arc;
use tracing::{info, instrument};

/// Default cap on simultaneously active bids per account.
pub const DEFAULT_MAX_ACTIVE_BIDS: u64 = 10;

/// Default bid lifetime in days.
pub const DEFAULT_BID_LIFETIME_DAYS: i64 = 10;

/// Limits applied when creating bids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingPolicy {
    /// Maximum bids an account may have open at once.
    pub max_active_bids_per_account: u64,
    /// Days until a new bid expires.
    pub bid_lifetime_days: i64,
}

impl Default for ListingPolicy {
    fn default() -> Self {
        Self {
            max_active_bids_per_account: DEFAULT_MAX_ACTIVE_BIDS,
            bid_lifetime_days: DEFAULT_BID_LIFETIME_DAYS,
        }
    }
}

/// Request to put shares on the market.
#[derive(Debug, Clone, Copy)]
pub struct CreateAskRequest {
    /// Selling account.
    pub owner_id: AccountId,
    /// Share to sell.
    pub share_id: ShareId,
    /// Shares to list.
    pub amount: Quantity,
    /// Fixed price; `None` sells at the share's market price.
    pub price: Option<Price>,
}

impl CreateAskRequest {
    /// Creates a new ask request.
    #[must_use]
    pub fn new(owner_id: AccountId, share_id: ShareId, amount: Quantity, price: Option<Price>) -> Self {
        Self {
            owner_id,
            share_id,
            amount,
            price,
        }
    }
}

/// Request to open a bid.
#[derive(Debug, Clone)]
pub struct CreateBidRequest {
    /// Buying account.
    pub creator_id: AccountId,
    /// Share wanted.
    pub share_id: ShareId,
    /// Shares wanted.
    pub amount: Quantity,
    /// Price per share.
    pub price: Price,
    /// Prepaid code the seller will redeem.
    pub payment_code: PaymentCode,
}

impl CreateBidRequest {
    /// Creates a new bid request.
    #[must_use]
    pub fn new(
        creator_id: AccountId,
        share_id: ShareId,
        amount: Quantity,
        price: Price,
        payment_code: PaymentCode,
    ) -> Self {
        Self {
            creator_id,
            share_id,
            amount,
            price,
            payment_code,
        }
    }
}

/// Creates and removes asks and bids.
#[derive(Debug)]
pub struct ListingService {
    store: Arc<dyn LedgerStore>,
    operations: OperationLedger,
    policy: ListingPolicy,
}

impl ListingService {
    /// Creates a new listing service.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, policy: ListingPolicy) -> Self {
        Self {
            store,
            operations: OperationLedger::new(),
            policy,
        }
    }

    /// Puts shares on the market.
    ///
    /// The owner must hold `amount` shares beyond those already listed on
    /// open asks or sold in pending operations.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if `amount` is zero
    /// - `NotFound` if the share does not exist
    /// - `InsufficientOwnership` if the owner lacks uncommitted shares
    /// - `ConcurrentUpdate` if every retry lost a row race
    #[instrument(skip(self, request), fields(owner_id = %request.owner_id, share_id = %request.share_id))]
    pub async fn create_ask(&self, request: CreateAskRequest) -> ApplicationResult<AskId> {
        if request.amount.is_zero() {
            return Err(ApplicationError::validation("amount must be positive"));
        }
        let pending = &request;
        let ask_id = retry_on_conflict(move || self.create_ask_once(pending)).await?;
        info!(ask_id = %ask_id, amount = %request.amount, "ask created");
        Ok(ask_id)
    }

    async fn create_ask_once(&self, request: &CreateAskRequest) -> ApplicationResult<AskId> {
        let mut tx = self.store.begin(IsolationLevel::RepeatableRead).await?;
        let result = self.create_ask_in(tx.as_mut(), request).await;
        finish(tx, result).await
    }

    async fn create_ask_in(
        &self,
        tx: &mut dyn LedgerTransaction,
        request: &CreateAskRequest,
    ) -> ApplicationResult<AskId> {
        if tx.find_share(request.share_id).await?.is_none() {
            return Err(ApplicationError::not_found("share", request.share_id));
        }

        let held = tx
            .lock_ownership(request.owner_id, request.share_id)
            .await?
            .map_or(Quantity::ZERO, |ownership| ownership.amount());
        let listed = tx
            .sum_listed_amount(request.share_id, request.owner_id)
            .await?;
        let pending = self
            .operations
            .sum_pending_amount(tx, request.share_id, request.owner_id)
            .await?;
        let committed = listed.safe_add(pending).map_err(DomainError::from)?;
        let free = held.saturating_sub(committed);
        if free < request.amount {
            return Err(ApplicationError::insufficient_ownership(request.amount, free));
        }

        let ask = Ask::new(request.owner_id, request.share_id, request.amount, request.price)?;
        tx.insert_ask(&ask).await?;
        Ok(ask.id())
    }

    /// Takes an ask off the market.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the ask is missing or already removed
    /// - `Forbidden` if `owner_id` does not own it
    #[instrument(skip(self))]
    pub async fn remove_ask(&self, owner_id: AccountId, ask_id: AskId) -> ApplicationResult<()> {
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let result = Self::remove_ask_in(tx.as_mut(), owner_id, ask_id).await;
        finish(tx, result).await?;
        info!("ask removed");
        Ok(())
    }

    async fn remove_ask_in(
        tx: &mut dyn LedgerTransaction,
        owner_id: AccountId,
        ask_id: AskId,
    ) -> ApplicationResult<()> {
        let mut ask = tx
            .lock_ask(ask_id)
            .await?
            .filter(|ask| !ask.is_removed())
            .ok_or_else(|| ApplicationError::not_found("ask", ask_id))?;
        if ask.owner_id() != owner_id {
            return Err(ApplicationError::forbidden(format!(
                "ask {ask_id} belongs to another account"
            )));
        }
        ask.remove();
        tx.update_ask(&ask).await?;
        Ok(())
    }

    /// Opens a bid that expires after the configured lifetime.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if `amount` is zero
    /// - `NotFound` if the creator or share does not exist
    /// - `LimitReached` if the creator already has the maximum active bids
    #[instrument(skip(self, request), fields(creator_id = %request.creator_id, share_id = %request.share_id))]
    pub async fn create_bid(&self, request: CreateBidRequest) -> ApplicationResult<BidId> {
        if request.amount.is_zero() {
            return Err(ApplicationError::validation("amount must be positive"));
        }
        // Read committed: the count below must see bids committed while
        // this transaction waited on the account lock.
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let result = self.create_bid_in(tx.as_mut(), request.clone()).await;
        let bid_id = finish(tx, result).await?;
        info!(bid_id = %bid_id, amount = %request.amount, price = %request.price, "bid created");
        Ok(bid_id)
    }

    async fn create_bid_in(
        &self,
        tx: &mut dyn LedgerTransaction,
        request: CreateBidRequest,
    ) -> ApplicationResult<BidId> {
        // Account row lock serializes bid creation per creator
        if tx.lock_account(request.creator_id).await?.is_none() {
            return Err(ApplicationError::not_found("account", request.creator_id));
        }
        if tx.find_share(request.share_id).await?.is_none() {
            return Err(ApplicationError::not_found("share", request.share_id));
        }

        let now = Timestamp::now();
        let active = tx.count_active_bids(request.creator_id, now).await?;
        if active >= self.policy.max_active_bids_per_account {
            return Err(ApplicationError::LimitReached(format!(
                "{active} active bids, max {}",
                self.policy.max_active_bids_per_account
            )));
        }

        let bid = Bid::new(
            request.creator_id,
            request.share_id,
            request.amount,
            request.price,
            request.payment_code,
            now.add_days(self.policy.bid_lifetime_days),
        )?;
        tx.insert_bid(&bid).await?;
        Ok(bid.id())
    }

    /// Withdraws a bid.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the bid is missing or already removed
    /// - `Forbidden` if `creator_id` did not create it
    #[instrument(skip(self))]
    pub async fn remove_bid(&self, creator_id: AccountId, bid_id: BidId) -> ApplicationResult<()> {
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let result = Self::remove_bid_in(tx.as_mut(), creator_id, bid_id).await;
        finish(tx, result).await?;
        info!("bid removed");
        Ok(())
    }

    async fn remove_bid_in(
        tx: &mut dyn LedgerTransaction,
        creator_id: AccountId,
        bid_id: BidId,
    ) -> ApplicationResult<()> {
        let mut bid = tx
            .lock_bid(bid_id)
            .await?
            .filter(|bid| !bid.is_removed())
            .ok_or_else(|| ApplicationError::not_found("bid", bid_id))?;
        if bid.creator_id() != creator_id {
            return Err(ApplicationError::forbidden(format!(
                "bid {bid_id} belongs to another account"
            )));
        }
        bid.remove();
        tx.update_bid(&bid).await?;
        Ok(())
    }
}
