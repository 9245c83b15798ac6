//! # Settlement Saga End-to-End Tests
//!
//! Drives accounts, listings and the settlement saga through the public API,
//! with the in-memory bus standing in for the payment and card services.
//! Outbound requests are read back from the bus and verdicts are delivered
//! through the same consumers the service subscribes in production.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use serde_json::Value;
use share_ledger::application::services::StoreAccountGate;
use share_ledger::application::use_cases::{
    AccountService, BuyRequest, CreateAskRequest, CreateBidRequest, IssueShareRequest,
    ListingPolicy, ListingService, RegisterAccountRequest, SettlementOrchestrator, ShareService,
    TakeBidRequest,
};
use share_ledger::domain::events::{CardVerified, SettlementResult, Topic};
use share_ledger::domain::value_objects::{
    AccountId, AccountRole, CardNumber, IsolationLevel, OperationId, OperationStatus,
    PaymentCard, PaymentCode, Price, Quantity, ShareId,
};
use share_ledger::infrastructure::messaging::{
    BusPublisher, DeliveryOutcome, InMemoryMessageBus, subscribe_all,
};
use share_ledger::infrastructure::persistence::{
    InMemoryLedgerStore, LedgerStore, LedgerTransaction,
};
use std::sync::Arc;

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    store: Arc<InMemoryLedgerStore>,
    bus: InMemoryMessageBus,
    orchestrator: Arc<SettlementOrchestrator>,
    accounts: Arc<AccountService>,
    listings: ListingService,
    shares: ShareService,
    cards_issued: u64,
}

impl Harness {
    async fn new() -> Self {
        let store = Arc::new(InMemoryLedgerStore::new());
        let ledger: Arc<dyn LedgerStore> = store.clone();
        let bus = InMemoryMessageBus::new();
        let publisher = Arc::new(BusPublisher::new(Arc::new(bus.clone())));

        let orchestrator = Arc::new(SettlementOrchestrator::new(
            Arc::clone(&ledger),
            Arc::new(StoreAccountGate::new(Arc::clone(&ledger))),
            publisher.clone(),
        ));
        let accounts = Arc::new(AccountService::new(Arc::clone(&ledger), publisher));
        subscribe_all(&bus, Arc::clone(&orchestrator), Arc::clone(&accounts))
            .await
            .unwrap();

        Self {
            store,
            bus,
            orchestrator,
            accounts,
            listings: ListingService::new(Arc::clone(&ledger), ListingPolicy::default()),
            shares: ShareService::new(ledger),
            cards_issued: 0,
        }
    }

    /// Registers an account and activates it through the card-check round trip.
    async fn activated(&mut self, role: AccountRole) -> (AccountId, CardNumber) {
        self.cards_issued += 1;
        let id = AccountId::new_v4();
        let card = CardNumber::new(format!("5500{:012}", self.cards_issued)).unwrap();

        self.accounts
            .register_account(RegisterAccountRequest::new(
                id,
                format!("{id}@example.com"),
                "Trader",
                role,
            ))
            .await
            .unwrap();
        self.accounts
            .update_card_number(id, card.clone())
            .await
            .unwrap();

        let checks: Vec<Value> = self.bus.published_json(Topic::CardCheck).await.unwrap();
        let last = checks.last().unwrap();
        assert_eq!(last["accountId"], id.to_string());
        assert_eq!(last["cardNumber"], card.as_str());

        let verdict = CardVerified {
            account_id: id,
            card_number: card.clone(),
            valid: true,
        };
        let outcome = self
            .bus
            .deliver_json(Topic::CardVerified, &id.to_string(), &verdict)
            .await
            .unwrap();
        assert_eq!(outcome, DeliveryOutcome::Acked);
        assert!(self.store.account(id).await.unwrap().is_activated());
        (id, card)
    }

    async fn issue(&self, issuer: AccountId, ticker: &str, price: u64, amount: u64) -> ShareId {
        self.shares
            .issue_share(IssueShareRequest::new(
                issuer,
                ticker,
                ticker.to_uppercase(),
                Price::from_units(price).unwrap(),
                Quantity::new(amount),
            ))
            .await
            .unwrap()
    }

    async fn verdict(&self, operation_id: OperationId, succeeded: bool) -> DeliveryOutcome {
        let result = SettlementResult {
            operation_id,
            succeeded,
        };
        self.bus
            .deliver_json(Topic::SettlementResult, &operation_id.to_string(), &result)
            .await
            .unwrap()
    }

    async fn held(&self, account: AccountId, share: ShareId) -> u64 {
        self.store.ownership_amount(account, share).await.get()
    }

    async fn status(&self, operation_id: OperationId) -> OperationStatus {
        self.store.operation(operation_id).await.unwrap().status()
    }
}

fn card_payment(card: &CardNumber) -> PaymentCard {
    PaymentCard::new(card.clone(), "321", 11, 2031).unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn buy_from_ask_settles_through_the_bus() {
    let mut h = Harness::new().await;
    let (seller, seller_card) = h.activated(AccountRole::Company).await;
    let (buyer, buyer_card) = h.activated(AccountRole::User).await;
    let share = h.issue(seller, "acme", 10, 100).await;
    let ask = h
        .listings
        .create_ask(CreateAskRequest::new(seller, share, Quantity::new(100), None))
        .await
        .unwrap();

    let operation = h
        .orchestrator
        .buy(BuyRequest::new(buyer, ask, Quantity::new(30), card_payment(&buyer_card)))
        .await
        .unwrap();

    assert_eq!(h.status(operation).await, OperationStatus::PendingPayment);
    assert_eq!(h.store.ask(ask).await.unwrap().amount().get(), 70);
    let charges: Vec<Value> = h.bus.published_json(Topic::ChargeCard).await.unwrap();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0]["operationId"], operation.to_string());
    assert_eq!(charges[0]["receiverCardNumber"], seller_card.as_str());
    let amount: Decimal = charges[0]["amount"].as_str().unwrap().parse().unwrap();
    assert_eq!(amount, Decimal::from(300));

    assert_eq!(h.verdict(operation, true).await, DeliveryOutcome::Acked);

    assert_eq!(h.status(operation).await, OperationStatus::Succeed);
    assert_eq!(h.held(seller, share).await, 70);
    assert_eq!(h.held(buyer, share).await, 30);
    assert_eq!(h.store.total_owned(share).await, 100);
}

#[tokio::test]
async fn failed_redeem_restores_the_bid() {
    let mut h = Harness::new().await;
    let (bidder, _) = h.activated(AccountRole::User).await;
    let (seller, seller_card) = h.activated(AccountRole::Company).await;
    let share = h.issue(seller, "dyna", 5, 40).await;
    let bid = h
        .listings
        .create_bid(CreateBidRequest::new(
            bidder,
            share,
            Quantity::new(50),
            Price::from_units(5).unwrap(),
            PaymentCode::new("VOUCHER-50").unwrap(),
        ))
        .await
        .unwrap();

    let operation = h
        .orchestrator
        .take_bid(TakeBidRequest::new(seller, bid, Quantity::new(20)))
        .await
        .unwrap();

    assert_eq!(h.store.bid(bid).await.unwrap().amount().get(), 30);
    let redeems: Vec<Value> = h.bus.published_json(Topic::RedeemCode).await.unwrap();
    assert_eq!(redeems.len(), 1);
    assert_eq!(redeems[0]["paymentCode"], "VOUCHER-50");
    assert_eq!(redeems[0]["receiverCardNumber"], seller_card.as_str());

    assert_eq!(h.verdict(operation, false).await, DeliveryOutcome::Acked);

    assert_eq!(h.status(operation).await, OperationStatus::Rejected);
    assert_eq!(h.store.bid(bid).await.unwrap().amount().get(), 50);
    assert_eq!(h.held(seller, share).await, 40);
    assert_eq!(h.held(bidder, share).await, 0);
}

#[tokio::test]
async fn inconsistent_settlement_is_redelivered_until_it_applies() {
    let mut h = Harness::new().await;
    let (seller, _) = h.activated(AccountRole::Company).await;
    let (buyer, buyer_card) = h.activated(AccountRole::User).await;
    let share = h.issue(seller, "flux", 10, 10).await;
    let ask = h
        .listings
        .create_ask(CreateAskRequest::new(seller, share, Quantity::new(10), None))
        .await
        .unwrap();
    let operation = h
        .orchestrator
        .buy(BuyRequest::new(buyer, ask, Quantity::new(4), card_payment(&buyer_card)))
        .await
        .unwrap();

    // Drain the seller's balance behind the ledger's back.
    let mut tx = h.store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    let mut balance = tx.lock_ownership(seller, share).await.unwrap().unwrap();
    balance.debit(Quantity::new(10)).unwrap();
    tx.update_ownership(&balance).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(h.verdict(operation, true).await, DeliveryOutcome::Pending);
    assert_eq!(h.bus.pending_count().await, 1);
    assert_eq!(h.status(operation).await, OperationStatus::PendingPayment);
    assert_eq!(h.held(buyer, share).await, 0);

    let mut tx = h.store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    tx.credit_ownership(seller, share, Quantity::new(10))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let outcomes = h.bus.redeliver_pending().await.unwrap();
    assert_eq!(outcomes, vec![DeliveryOutcome::Acked]);
    assert_eq!(h.bus.pending_count().await, 0);
    assert_eq!(h.status(operation).await, OperationStatus::Succeed);
    assert_eq!(h.held(seller, share).await, 6);
    assert_eq!(h.held(buyer, share).await, 4);
}

#[tokio::test]
async fn duplicate_verdicts_are_acked_without_effect() {
    let mut h = Harness::new().await;
    let (seller, _) = h.activated(AccountRole::Company).await;
    let (buyer, buyer_card) = h.activated(AccountRole::User).await;
    let share = h.issue(seller, "beta", 3, 20).await;
    let ask = h
        .listings
        .create_ask(CreateAskRequest::new(seller, share, Quantity::new(20), None))
        .await
        .unwrap();
    let operation = h
        .orchestrator
        .buy(BuyRequest::new(buyer, ask, Quantity::new(5), card_payment(&buyer_card)))
        .await
        .unwrap();

    assert_eq!(h.verdict(operation, true).await, DeliveryOutcome::Acked);
    assert_eq!(h.verdict(operation, true).await, DeliveryOutcome::Acked);
    assert_eq!(h.verdict(operation, false).await, DeliveryOutcome::Acked);

    assert_eq!(h.status(operation).await, OperationStatus::Succeed);
    assert_eq!(h.held(buyer, share).await, 5);
    assert_eq!(h.held(seller, share).await, 15);
    assert_eq!(h.store.ask(ask).await.unwrap().amount().get(), 15);
}

#[tokio::test]
async fn malformed_and_unknown_verdicts_are_dropped() {
    let h = Harness::new().await;

    let outcome = h
        .bus
        .deliver(Topic::SettlementResult, "junk", b"not json".to_vec())
        .await
        .unwrap();
    assert_eq!(outcome, DeliveryOutcome::Acked);

    assert_eq!(
        h.verdict(OperationId::new_v4(), true).await,
        DeliveryOutcome::Acked
    );
    assert_eq!(h.bus.pending_count().await, 0);
    assert_eq!(h.store.operation_count().await, 0);
}

#[tokio::test]
async fn rejected_card_keeps_account_out_of_trading() {
    let mut h = Harness::new().await;
    let (seller, _) = h.activated(AccountRole::Company).await;
    let share = h.issue(seller, "gamma", 2, 10).await;
    let ask = h
        .listings
        .create_ask(CreateAskRequest::new(seller, share, Quantity::new(10), None))
        .await
        .unwrap();

    let buyer = AccountId::new_v4();
    let card = CardNumber::new("4000123412341234").unwrap();
    h.accounts
        .register_account(RegisterAccountRequest::new(
            buyer,
            "late@example.com",
            "Late",
            AccountRole::User,
        ))
        .await
        .unwrap();
    h.accounts.update_card_number(buyer, card.clone()).await.unwrap();
    let verdict = CardVerified {
        account_id: buyer,
        card_number: card.clone(),
        valid: false,
    };
    h.bus
        .deliver_json(Topic::CardVerified, &buyer.to_string(), &verdict)
        .await
        .unwrap();

    let result = h
        .orchestrator
        .buy(BuyRequest::new(buyer, ask, Quantity::new(1), card_payment(&card)))
        .await;

    assert!(result.is_err());
    assert!(!h.store.account(buyer).await.unwrap().is_activated());
    assert_eq!(h.store.ask(ask).await.unwrap().amount().get(), 10);
    assert!(h.bus.published(Topic::ChargeCard).await.is_empty());
}
