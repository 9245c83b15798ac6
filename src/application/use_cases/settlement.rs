//! # Settlement Orchestrator
//!
//! Drives the trade saga.
//!
//! A trade starts with [`SettlementOrchestrator::buy`] (against an ask) or
//! [`SettlementOrchestrator::take_bid`] (against a bid). Either one reserves
//! inventory, records a pending operation and asks the payment processor to
//! move the money, all in one transaction. The processor's verdict later
//! arrives as a settlement result and either transfers ownership
//! ([`SettlementOrchestrator::on_payment_succeeded`]) or gives the reserved
//! shares back ([`SettlementOrchestrator::on_payment_failed`]).
//!
//! Every entry point is all-or-nothing. Callbacks are idempotent: an
//! operation that is unknown or already final is left untouched.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::{
    AccountGate, OperationLedger, ReservationManager, finish, retry_on_conflict,
};
use crate::domain::entities::{Account, Ask, OperationOrigin};
use crate::domain::errors::DomainError;
use crate::domain::events::{ChargeCardRequested, RedeemCodeRequested, SettlementResult};
use crate::domain::value_objects::{
    AccountId, AskId, BidId, CardNumber, CheckedArithmetic, IsolationLevel, OperationId,
    OperationStatus, PaymentCard, Quantity,
};
use crate::infrastructure::persistence::traits::{LedgerStore, LedgerTransaction};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Outbound port for payment requests.
#[async_trait]
pub trait PaymentRequestPublisher: Send + Sync + fmt::Debug {
    /// Asks the processor to charge the buyer's card.
    async fn publish_charge_card(&self, request: &ChargeCardRequested) -> ApplicationResult<()>;

    /// Asks the processor to redeem a bid's prepaid code.
    async fn publish_redeem_code(&self, request: &RedeemCodeRequested) -> ApplicationResult<()>;
}

/// Request to buy shares from an ask.
#[derive(Debug, Clone)]
pub struct BuyRequest {
    /// Buying account.
    pub buyer_id: AccountId,
    /// Ask to buy from.
    pub ask_id: AskId,
    /// Shares to buy.
    pub amount: Quantity,
    /// Buyer's card to charge.
    pub payment: PaymentCard,
}

impl BuyRequest {
    /// Creates a new buy request.
    #[must_use]
    pub fn new(buyer_id: AccountId, ask_id: AskId, amount: Quantity, payment: PaymentCard) -> Self {
        Self {
            buyer_id,
            ask_id,
            amount,
            payment,
        }
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if `amount` is zero.
    pub fn validate(&self) -> ApplicationResult<()> {
        if self.amount.is_zero() {
            return Err(ApplicationError::validation("amount must be positive"));
        }
        Ok(())
    }
}

/// Request to sell shares into a bid.
#[derive(Debug, Clone, Copy)]
pub struct TakeBidRequest {
    /// Selling account.
    pub seller_id: AccountId,
    /// Bid to fill.
    pub bid_id: BidId,
    /// Shares to sell.
    pub amount: Quantity,
}

impl TakeBidRequest {
    /// Creates a new take-bid request.
    #[must_use]
    pub fn new(seller_id: AccountId, bid_id: BidId, amount: Quantity) -> Self {
        Self {
            seller_id,
            bid_id,
            amount,
        }
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if `amount` is zero.
    pub fn validate(&self) -> ApplicationResult<()> {
        if self.amount.is_zero() {
            return Err(ApplicationError::validation("amount must be positive"));
        }
        Ok(())
    }
}

/// What a settlement callback did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The operation moved to this terminal status.
    Applied(OperationStatus),
    /// No operation with that id.
    UnknownOperation,
    /// The operation was already final; nothing changed.
    AlreadyFinal(OperationStatus),
}

/// Saga driver for trades.
#[derive(Debug)]
pub struct SettlementOrchestrator {
    store: Arc<dyn LedgerStore>,
    accounts: Arc<dyn AccountGate>,
    publisher: Arc<dyn PaymentRequestPublisher>,
    reservations: ReservationManager,
    operations: OperationLedger,
}

impl SettlementOrchestrator {
    /// Creates a new orchestrator.
    #[must_use]
    pub fn new(
        store: Arc<dyn LedgerStore>,
        accounts: Arc<dyn AccountGate>,
        publisher: Arc<dyn PaymentRequestPublisher>,
    ) -> Self {
        Self {
            store,
            accounts,
            publisher,
            reservations: ReservationManager::new(),
            operations: OperationLedger::new(),
        }
    }

    /// Buys shares from an ask.
    ///
    /// Reserves `amount` on the ask, records a pending operation priced at
    /// the ask's fixed price (or the share's current price) and publishes a
    /// card charge request paying the ask owner.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the buyer, ask (or removed ask), owner or share is missing
    /// - `NotActivated` if buyer or owner has no verified card
    /// - `SelfTrade` if the buyer owns the ask
    /// - `InsufficientInventory` if the ask has fewer than `amount` shares left
    /// - `Messaging` / `TransientStoreFailure` if publish or commit fails
    /// - `ConcurrentUpdate` if every retry lost a row race
    #[instrument(
        skip(self, request),
        fields(buyer_id = %request.buyer_id, ask_id = %request.ask_id, amount = %request.amount)
    )]
    pub async fn buy(&self, request: BuyRequest) -> ApplicationResult<OperationId> {
        request.validate()?;

        // Preconditions, checked before the saga transaction opens
        let buyer = self.accounts.get_account(request.buyer_id).await?;
        if !buyer.is_activated() {
            return Err(ApplicationError::not_activated(buyer.id()));
        }
        let ask = self.peek_ask(request.ask_id).await?;
        if ask.owner_id() == request.buyer_id {
            return Err(ApplicationError::SelfTrade(format!("ask {}", ask.id())));
        }
        let owner = self.accounts.get_account(ask.owner_id()).await?;
        let receiver = payout_card(&owner)?;

        let (request, receiver) = (&request, &receiver);
        let operation_id = retry_on_conflict(move || self.buy_once(request, receiver)).await?;

        info!(operation_id = %operation_id, "purchase pending payment");
        Ok(operation_id)
    }

    async fn buy_once(
        &self,
        request: &BuyRequest,
        receiver: &CardNumber,
    ) -> ApplicationResult<OperationId> {
        let mut tx = self.store.begin(IsolationLevel::RepeatableRead).await?;
        let result = self.buy_in(tx.as_mut(), request, receiver.clone()).await;
        finish(tx, result).await
    }

    async fn buy_in(
        &self,
        tx: &mut dyn LedgerTransaction,
        request: &BuyRequest,
        receiver: CardNumber,
    ) -> ApplicationResult<OperationId> {
        // Lock and reserve
        let ask = self
            .reservations
            .reserve_from_ask(tx, request.ask_id, request.amount)
            .await?;

        // Price at the moment of purchase
        let share = tx
            .find_share(ask.share_id())
            .await?
            .ok_or_else(|| ApplicationError::not_found("share", ask.share_id()))?;
        let price = ask.effective_price(&share);

        let operation = self
            .operations
            .create(
                tx,
                ask.owner_id(),
                request.buyer_id,
                ask.share_id(),
                OperationOrigin::Ask(ask.id()),
                price,
                request.amount,
            )
            .await?;

        let charge =
            ChargeCardRequested::for_operation(&operation, request.payment.clone(), receiver)?;
        self.publisher.publish_charge_card(&charge).await?;

        Ok(operation.id())
    }

    /// Sells shares into a bid.
    ///
    /// Reserves `amount` on the bid, checks that the seller holds enough
    /// shares beyond those already listed or pending, records a pending
    /// operation at the bid's price and publishes a code redemption request
    /// paying the seller.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the seller or bid is missing
    /// - `NotActivated` if the seller has no verified card
    /// - `Removed` / `Expired` if the bid is no longer active
    /// - `InsufficientInventory` if the bid wants fewer than `amount` shares
    /// - `SelfTrade` if the seller created the bid
    /// - `InsufficientOwnership` if the seller lacks uncommitted shares
    /// - `Messaging` / `TransientStoreFailure` if publish or commit fails
    /// - `ConcurrentUpdate` if every retry lost a row race
    #[instrument(
        skip(self, request),
        fields(seller_id = %request.seller_id, bid_id = %request.bid_id, amount = %request.amount)
    )]
    pub async fn take_bid(&self, request: TakeBidRequest) -> ApplicationResult<OperationId> {
        request.validate()?;

        let seller = self.accounts.get_account(request.seller_id).await?;
        let receiver = payout_card(&seller)?;

        let (request, receiver) = (&request, &receiver);
        let operation_id =
            retry_on_conflict(move || self.take_bid_once(request, receiver)).await?;

        info!(operation_id = %operation_id, "bid sale pending payment");
        Ok(operation_id)
    }

    async fn take_bid_once(
        &self,
        request: &TakeBidRequest,
        receiver: &CardNumber,
    ) -> ApplicationResult<OperationId> {
        let mut tx = self.store.begin(IsolationLevel::RepeatableRead).await?;
        let result = self.take_bid_in(tx.as_mut(), request, receiver.clone()).await;
        finish(tx, result).await
    }

    async fn take_bid_in(
        &self,
        tx: &mut dyn LedgerTransaction,
        request: &TakeBidRequest,
        receiver: CardNumber,
    ) -> ApplicationResult<OperationId> {
        // Lock, re-validate and reserve
        let bid = self
            .reservations
            .reserve_from_bid(tx, request.bid_id, request.amount)
            .await?;
        if bid.creator_id() == request.seller_id {
            return Err(ApplicationError::SelfTrade(format!("bid {}", bid.id())));
        }

        // Seller must hold the shares on top of everything already committed.
        // The ownership lock writes the row, so a seller-side commit racing
        // this snapshot aborts with ConcurrentUpdate.
        let held = tx
            .lock_ownership(request.seller_id, bid.share_id())
            .await?
            .map_or(Quantity::ZERO, |ownership| ownership.amount());
        let pending = self
            .operations
            .sum_pending_amount(tx, bid.share_id(), request.seller_id)
            .await?;
        let listed = tx.sum_listed_amount(bid.share_id(), request.seller_id).await?;
        let committed = pending.safe_add(listed).map_err(DomainError::from)?;
        let required = request
            .amount
            .safe_add(committed)
            .map_err(DomainError::from)?;
        if held < required {
            return Err(ApplicationError::insufficient_ownership(
                request.amount,
                held.saturating_sub(committed),
            ));
        }

        let operation = self
            .operations
            .create(
                tx,
                request.seller_id,
                bid.creator_id(),
                bid.share_id(),
                OperationOrigin::Bid(bid.id()),
                bid.price(),
                request.amount,
            )
            .await?;

        let redeem =
            RedeemCodeRequested::for_operation(&operation, bid.payment_code().clone(), receiver)?;
        self.publisher.publish_redeem_code(&redeem).await?;

        Ok(operation.id())
    }

    /// Routes a settlement verdict to the matching callback.
    ///
    /// # Errors
    ///
    /// See [`Self::on_payment_succeeded`] and [`Self::on_payment_failed`].
    pub async fn on_settlement_result(
        &self,
        result: &SettlementResult,
    ) -> ApplicationResult<CallbackOutcome> {
        if result.succeeded {
            self.on_payment_succeeded(result.operation_id).await
        } else {
            self.on_payment_failed(result.operation_id).await
        }
    }

    /// Completes a paid operation: moves the shares from seller to buyer.
    ///
    /// # Errors
    ///
    /// - `SettlementInconsistency` if the seller no longer holds the shares
    /// - `TransientStoreFailure` if the store fails
    /// - `ConcurrentUpdate` if every retry lost a row race
    #[instrument(skip(self), fields(operation_id = %operation_id))]
    pub async fn on_payment_succeeded(
        &self,
        operation_id: OperationId,
    ) -> ApplicationResult<CallbackOutcome> {
        retry_on_conflict(move || self.settle_once(operation_id)).await
    }

    async fn settle_once(&self, operation_id: OperationId) -> ApplicationResult<CallbackOutcome> {
        let mut tx = self.store.begin(IsolationLevel::RepeatableRead).await?;
        let result = self.settle_in(tx.as_mut(), operation_id).await;
        finish(tx, result).await
    }

    async fn settle_in(
        &self,
        tx: &mut dyn LedgerTransaction,
        operation_id: OperationId,
    ) -> ApplicationResult<CallbackOutcome> {
        let Some(operation) = self.operations.find(tx, operation_id, true).await? else {
            warn!("settlement for unknown operation ignored");
            return Ok(CallbackOutcome::UnknownOperation);
        };
        if !operation.is_pending() {
            info!(status = %operation.status(), "operation already final, success ignored");
            return Ok(CallbackOutcome::AlreadyFinal(operation.status()));
        }

        let mut seller = match tx
            .lock_ownership(operation.seller_id(), operation.share_id())
            .await?
        {
            Some(ownership) if ownership.amount() >= operation.amount() => ownership,
            other => {
                let held = other.map_or(Quantity::ZERO, |ownership| ownership.amount());
                error!(
                    seller_id = %operation.seller_id(),
                    share_id = %operation.share_id(),
                    amount = %operation.amount(),
                    %held,
                    "seller cannot deliver paid shares"
                );
                return Err(ApplicationError::settlement_inconsistency(format!(
                    "operation {operation_id}: seller holds {held}, owes {}",
                    operation.amount()
                )));
            }
        };

        seller.debit(operation.amount())?;
        tx.update_ownership(&seller).await?;
        tx.credit_ownership(operation.buyer_id(), operation.share_id(), operation.amount())
            .await?;
        self.operations
            .set_status(tx, operation_id, OperationStatus::Succeed)
            .await?;

        info!(
            seller_id = %operation.seller_id(),
            buyer_id = %operation.buyer_id(),
            amount = %operation.amount(),
            "shares transferred"
        );
        Ok(CallbackOutcome::Applied(OperationStatus::Succeed))
    }

    /// Rejects an unpaid operation and gives the reserved shares back to
    /// the ask or bid it came from.
    ///
    /// # Errors
    ///
    /// Returns `TransientStoreFailure` if the store fails.
    #[instrument(skip(self), fields(operation_id = %operation_id))]
    pub async fn on_payment_failed(
        &self,
        operation_id: OperationId,
    ) -> ApplicationResult<CallbackOutcome> {
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let result = self.compensate_in(tx.as_mut(), operation_id).await;
        finish(tx, result).await
    }

    async fn compensate_in(
        &self,
        tx: &mut dyn LedgerTransaction,
        operation_id: OperationId,
    ) -> ApplicationResult<CallbackOutcome> {
        let Some(operation) = self.operations.find(tx, operation_id, true).await? else {
            warn!("payment failure for unknown operation ignored");
            return Ok(CallbackOutcome::UnknownOperation);
        };
        if !operation.is_pending() {
            info!(status = %operation.status(), "operation already final, failure ignored");
            return Ok(CallbackOutcome::AlreadyFinal(operation.status()));
        }

        let restored = match operation.origin() {
            OperationOrigin::Ask(ask_id) => {
                self.reservations
                    .release_to_ask(tx, ask_id, operation.amount())
                    .await?
            }
            OperationOrigin::Bid(bid_id) => {
                self.reservations
                    .release_to_bid(tx, bid_id, operation.amount())
                    .await?
            }
        };
        self.operations
            .set_status(tx, operation_id, OperationStatus::Rejected)
            .await?;

        info!(origin = %operation.origin(), restored, "operation rejected");
        Ok(CallbackOutcome::Applied(OperationStatus::Rejected))
    }

    /// Reads an ask outside the saga transaction for precondition checks.
    async fn peek_ask(&self, ask_id: AskId) -> ApplicationResult<Ask> {
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let ask = tx.find_ask(ask_id).await;
        tx.rollback().await?;
        ask?.filter(|ask| !ask.is_removed())
            .ok_or_else(|| ApplicationError::not_found("ask", ask_id))
    }
}

/// Card that receives the money, if the account may trade.
fn payout_card(account: &Account) -> ApplicationResult<CardNumber> {
    match account.card_number() {
        Some(card) if account.is_activated() => Ok(card.clone()),
        _ => Err(ApplicationError::not_activated(account.id())),
    }
}
