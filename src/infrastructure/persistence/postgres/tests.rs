//! # PostgreSQL Ledger Store Integration Tests
//!
//! These tests need a reachable PostgreSQL instance. They are marked with
//! `#[ignore]` and run with:
//! ```bash
//! TEST_DATABASE_URL=postgres://... cargo test --lib postgres::tests -- --ignored
//! ```
//!
//! Every test works on freshly generated ids, so no cleanup is needed
//! between runs.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;

use futures::future::join_all;
use sqlx::PgPool;

use crate::application::error::ApplicationError;
use crate::application::services::StoreAccountGate;
use crate::application::use_cases::{
    BuyRequest, CreateAskRequest, CreateBidRequest, ListingPolicy, ListingService,
    SettlementOrchestrator, TakeBidRequest,
};
use crate::domain::entities::{Account, Ask, Bid, Operation, OperationOrigin, Share};
use crate::domain::value_objects::{
    AccountId, AccountRole, CardNumber, IsolationLevel, OperationStatus, PaymentCard,
    PaymentCode, Price, Quantity, ShareId, Timestamp,
};
use crate::infrastructure::messaging::{BusPublisher, InMemoryMessageBus};
use crate::infrastructure::persistence::postgres::{PgLedgerStore, ensure_schema};
use crate::infrastructure::persistence::traits::{LedgerStore, RepositoryError};

// ============================================================================
// Test Helpers
// ============================================================================

async fn create_test_store() -> Option<PgLedgerStore> {
    let database_url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPool::connect(&database_url).await.ok()?;
    ensure_schema(&pool).await.ok()?;
    Some(PgLedgerStore::new(pool))
}

macro_rules! store_or_skip {
    () => {
        match create_test_store().await {
            Some(store) => store,
            None => {
                eprintln!("Skipping test: TEST_DATABASE_URL not set");
                return;
            }
        }
    };
}

fn unique_account(role: AccountRole) -> Account {
    let id = AccountId::new_v4();
    Account::new(id, format!("{id}@example.com"), "Test", role)
}

fn card_for(id: AccountId) -> CardNumber {
    CardNumber::new(format!("{:016}", id.get().as_u128() % 10_u128.pow(16))).unwrap()
}

/// Gives `account` a verified card and persists it.
async fn activate(store: &PgLedgerStore, account: &mut Account) {
    let card = card_for(account.id());
    account.change_card(card.clone());
    assert!(account.activate_with(&card));
    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    tx.update_account(account).await.unwrap();
    tx.commit().await.unwrap();
}

/// Inserts an activated user account.
async fn active_user(store: &PgLedgerStore) -> Account {
    let mut account = unique_account(AccountRole::User);
    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    tx.insert_account(&account).await.unwrap();
    tx.commit().await.unwrap();
    activate(store, &mut account).await;
    account
}

fn orchestrator(store: &PgLedgerStore) -> Arc<SettlementOrchestrator> {
    let store: Arc<dyn LedgerStore> = Arc::new(store.clone());
    let publisher = Arc::new(BusPublisher::new(Arc::new(InMemoryMessageBus::new())));
    Arc::new(SettlementOrchestrator::new(
        Arc::clone(&store),
        Arc::new(StoreAccountGate::new(Arc::clone(&store))),
        publisher,
    ))
}

async fn committed_amounts(
    store: &PgLedgerStore,
    share_id: ShareId,
    seller_id: AccountId,
) -> (u64, u64) {
    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    let listed = tx.sum_listed_amount(share_id, seller_id).await.unwrap();
    let pending = tx.sum_pending_amount(share_id, seller_id).await.unwrap();
    tx.rollback().await.unwrap();
    (listed.get(), pending.get())
}

fn unique_ticker() -> String {
    AccountId::new_v4().to_string().replace('-', "")[..10].to_string()
}

/// Inserts an issuer, a share and `held` units owned by a seller.
async fn seed_market(store: &PgLedgerStore, held: u64) -> (Account, Account, Share) {
    let issuer = unique_account(AccountRole::Company);
    let seller = unique_account(AccountRole::User);
    let share = Share::new(
        issuer.id(),
        &unique_ticker(),
        "Test Share",
        Price::from_units(10).unwrap(),
    )
    .unwrap();

    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    tx.insert_account(&issuer).await.unwrap();
    tx.insert_account(&seller).await.unwrap();
    tx.insert_share(&share).await.unwrap();
    tx.credit_ownership(seller.id(), share.id(), Quantity::new(held))
        .await
        .unwrap();
    tx.commit().await.unwrap();
    (issuer, seller, share)
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn account_round_trip_and_card_lookup() {
    let store = store_or_skip!();
    let mut account = unique_account(AccountRole::User);
    let digits = format!("{:016}", account.id().get().as_u128() % 10_u128.pow(16));
    let card = CardNumber::new(digits).unwrap();

    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    tx.insert_account(&account).await.unwrap();
    account.change_card(card.clone());
    tx.update_account(&account).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    let by_card = tx.find_account_by_card(&card).await.unwrap().unwrap();
    let by_email = tx.find_account_by_email(account.email()).await.unwrap().unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(by_card.id(), account.id());
    assert_eq!(by_email.card_number(), Some(&card));
    assert!(!by_email.is_activated());
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn duplicate_email_is_conflict() {
    let store = store_or_skip!();
    let first = unique_account(AccountRole::User);
    let second = Account::new(AccountId::new_v4(), first.email(), "Other", AccountRole::User);

    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    tx.insert_account(&first).await.unwrap();
    let err = tx.insert_account(&second).await.unwrap_err();
    tx.rollback().await.unwrap();

    assert!(matches!(err, RepositoryError::Conflict(_)));
}

// ============================================================================
// Ownership and listings
// ============================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn credit_ownership_upserts() {
    let store = store_or_skip!();
    let (_, seller, share) = seed_market(&store, 40).await;

    let mut tx = store.begin(IsolationLevel::RepeatableRead).await.unwrap();
    let credited = tx
        .credit_ownership(seller.id(), share.id(), Quantity::new(2))
        .await
        .unwrap();
    let mut locked = tx.lock_ownership(seller.id(), share.id()).await.unwrap().unwrap();
    locked.debit(Quantity::new(12)).unwrap();
    tx.update_ownership(&locked).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(credited.amount().get(), 42);

    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    let reloaded = tx.lock_ownership(seller.id(), share.id()).await.unwrap().unwrap();
    tx.rollback().await.unwrap();
    assert_eq!(reloaded.amount().get(), 30);
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn listed_amount_ignores_removed_asks() {
    let store = store_or_skip!();
    let (_, seller, share) = seed_market(&store, 100).await;
    let open = Ask::new(seller.id(), share.id(), Quantity::new(25), None).unwrap();
    let mut removed = Ask::new(
        seller.id(),
        share.id(),
        Quantity::new(30),
        Some(Price::from_units(12).unwrap()),
    )
    .unwrap();

    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    tx.insert_ask(&open).await.unwrap();
    tx.insert_ask(&removed).await.unwrap();
    removed.remove();
    tx.update_ask(&removed).await.unwrap();
    let listed = tx.sum_listed_amount(share.id(), seller.id()).await.unwrap();
    let reloaded = tx.lock_ask(removed.id()).await.unwrap().unwrap();
    tx.commit().await.unwrap();

    assert_eq!(listed.get(), 25);
    assert!(reloaded.is_removed());
    assert_eq!(reloaded.fixed_price(), removed.fixed_price());
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn find_ask_does_not_wait_for_row_lock() {
    let store = store_or_skip!();
    let (_, seller, share) = seed_market(&store, 10).await;
    let ask = Ask::new(seller.id(), share.id(), Quantity::new(10), None).unwrap();
    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    tx.insert_ask(&ask).await.unwrap();
    tx.commit().await.unwrap();

    let mut holder = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    holder.lock_ask(ask.id()).await.unwrap().unwrap();

    let mut reader = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    let found = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        reader.find_ask(ask.id()),
    )
    .await
    .expect("find_ask blocked on a row lock")
    .unwrap()
    .unwrap();
    reader.rollback().await.unwrap();
    holder.rollback().await.unwrap();

    assert_eq!(found.amount().get(), 10);
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn active_bids_exclude_expired() {
    let store = store_or_skip!();
    let (_, buyer, share) = seed_market(&store, 0).await;
    let now = Timestamp::now();
    let bid = |expires_at| {
        Bid::new(
            buyer.id(),
            share.id(),
            Quantity::new(5),
            Price::from_units(9).unwrap(),
            PaymentCode::new("CODE").unwrap(),
            expires_at,
        )
        .unwrap()
    };

    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    tx.insert_bid(&bid(now.add_days(3))).await.unwrap();
    tx.insert_bid(&bid(now.add_days(-1))).await.unwrap();
    let active = tx.count_active_bids(buyer.id(), now).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(active, 1);
}

// ============================================================================
// Operations
// ============================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn operation_status_and_pending_sum() {
    let store = store_or_skip!();
    let (_, seller, share) = seed_market(&store, 50).await;
    let buyer = unique_account(AccountRole::User);
    let ask = Ask::new(seller.id(), share.id(), Quantity::new(50), None).unwrap();
    let operation = Operation::new(
        seller.id(),
        buyer.id(),
        share.id(),
        OperationOrigin::Ask(ask.id()),
        Price::from_units(10).unwrap(),
        Quantity::new(7),
    )
    .unwrap();

    let mut tx = store.begin(IsolationLevel::RepeatableRead).await.unwrap();
    tx.insert_account(&buyer).await.unwrap();
    tx.insert_ask(&ask).await.unwrap();
    tx.insert_operation(&operation).await.unwrap();
    let pending = tx.sum_pending_amount(share.id(), seller.id()).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(pending.get(), 7);

    let mut tx = store.begin(IsolationLevel::RepeatableRead).await.unwrap();
    let locked = tx.find_operation(operation.id(), true).await.unwrap().unwrap();
    assert_eq!(locked.origin(), OperationOrigin::Ask(ask.id()));
    tx.update_operation_status(operation.id(), OperationStatus::Succeed)
        .await
        .unwrap();
    let pending = tx.sum_pending_amount(share.id(), seller.id()).await.unwrap();
    tx.commit().await.unwrap();

    assert!(pending.is_zero());
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn rollback_discards_writes() {
    let store = store_or_skip!();
    let account = unique_account(AccountRole::User);

    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    tx.insert_account(&account).await.unwrap();
    tx.rollback().await.unwrap();

    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    assert!(tx.find_account(account.id()).await.unwrap().is_none());
    tx.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn updating_missing_operation_is_not_found() {
    let store = store_or_skip!();

    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    let err = tx
        .update_operation_status(
            crate::domain::value_objects::OperationId::new_v4(),
            OperationStatus::Rejected,
        )
        .await
        .unwrap_err();
    tx.rollback().await.unwrap();

    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn ownership_lock_fails_on_snapshot_older_than_seller_commit() {
    let store = store_or_skip!();
    let (_, seller, share) = seed_market(&store, 60).await;

    // Snapshot taken before the competing write commits
    let mut late = store.begin(IsolationLevel::RepeatableRead).await.unwrap();
    let before = late.sum_pending_amount(share.id(), seller.id()).await.unwrap();
    assert!(before.is_zero());

    let mut early = store.begin(IsolationLevel::RepeatableRead).await.unwrap();
    early.lock_ownership(seller.id(), share.id()).await.unwrap();
    early.commit().await.unwrap();

    let err = late
        .lock_ownership(seller.id(), share.id())
        .await
        .unwrap_err();
    late.rollback().await.unwrap();
    assert!(matches!(err, RepositoryError::ConcurrentUpdate(_)));
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn concurrent_take_bids_never_oversell_seller() {
    let store = store_or_skip!();
    let (_, mut seller, share) = seed_market(&store, 60).await;
    activate(&store, &mut seller).await;

    let mut bids = Vec::new();
    for _ in 0..8 {
        let buyer = active_user(&store).await;
        let bid = Bid::new(
            buyer.id(),
            share.id(),
            Quantity::new(40),
            Price::from_units(10).unwrap(),
            PaymentCode::new("CODE").unwrap(),
            Timestamp::now().add_days(1),
        )
        .unwrap();
        let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
        tx.insert_bid(&bid).await.unwrap();
        tx.commit().await.unwrap();
        bids.push(bid.id());
    }

    let orchestrator = orchestrator(&store);
    let results = join_all(bids.into_iter().map(|bid_id| {
        let orchestrator = Arc::clone(&orchestrator);
        let request = TakeBidRequest::new(seller.id(), bid_id, Quantity::new(40));
        tokio::spawn(async move { orchestrator.take_bid(request).await })
    }))
    .await;

    let mut sold = 0;
    for result in results {
        match result.unwrap() {
            Ok(_) => sold += 1,
            Err(
                ApplicationError::InsufficientOwnership { .. }
                | ApplicationError::ConcurrentUpdate(_),
            ) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(sold, 1);
    assert_eq!(committed_amounts(&store, share.id(), seller.id()).await, (0, 40));
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn concurrent_asks_never_list_more_than_held() {
    let store = store_or_skip!();
    let (_, seller, share) = seed_market(&store, 60).await;
    let listings = Arc::new(ListingService::new(
        Arc::new(store.clone()),
        ListingPolicy::default(),
    ));

    let results = join_all((0..8).map(|_| {
        let listings = Arc::clone(&listings);
        let request = CreateAskRequest::new(seller.id(), share.id(), Quantity::new(40), None);
        tokio::spawn(async move { listings.create_ask(request).await })
    }))
    .await;

    let created = results
        .into_iter()
        .filter(|result| result.as_ref().unwrap().is_ok())
        .count();
    assert_eq!(created, 1);
    assert_eq!(committed_amounts(&store, share.id(), seller.id()).await, (40, 0));
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn concurrent_buys_on_one_ask_conserve_inventory() {
    let store = store_or_skip!();
    let (_, mut seller, share) = seed_market(&store, 50).await;
    activate(&store, &mut seller).await;
    let ask = Ask::new(seller.id(), share.id(), Quantity::new(50), None).unwrap();
    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    tx.insert_ask(&ask).await.unwrap();
    tx.commit().await.unwrap();

    let mut requests = Vec::new();
    for _ in 0..8 {
        let buyer = active_user(&store).await;
        let card = PaymentCard::new(card_for(buyer.id()), "123", 12, 2030).unwrap();
        requests.push(BuyRequest::new(buyer.id(), ask.id(), Quantity::new(10), card));
    }

    let orchestrator = orchestrator(&store);
    let results = join_all(requests.into_iter().map(|request| {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.buy(request).await })
    }))
    .await;

    let mut bought = 0_u64;
    for result in results {
        match result.unwrap() {
            Ok(_) => bought += 10,
            Err(
                ApplicationError::InsufficientInventory { .. }
                | ApplicationError::ConcurrentUpdate(_),
            ) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert!(bought <= 50);
    let (listed, pending) = committed_amounts(&store, share.id(), seller.id()).await;
    assert_eq!(pending, bought);
    assert_eq!(listed + pending, 50);
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn concurrent_bids_respect_active_cap() {
    let store = store_or_skip!();
    let (_, buyer, share) = seed_market(&store, 0).await;
    let listings = Arc::new(ListingService::new(
        Arc::new(store.clone()),
        ListingPolicy {
            max_active_bids_per_account: 10,
            bid_lifetime_days: 1,
        },
    ));

    let results = join_all((0..20).map(|_| {
        let listings = Arc::clone(&listings);
        let request = CreateBidRequest::new(
            buyer.id(),
            share.id(),
            Quantity::new(1),
            Price::from_units(10).unwrap(),
            PaymentCode::new("CODE").unwrap(),
        );
        tokio::spawn(async move { listings.create_bid(request).await })
    }))
    .await;

    let created = results
        .into_iter()
        .filter(|result| result.as_ref().unwrap().is_ok())
        .count();
    assert_eq!(created, 10);

    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    let active = tx.count_active_bids(buyer.id(), Timestamp::now()).await.unwrap();
    tx.rollback().await.unwrap();
    assert_eq!(active, 10);
}
