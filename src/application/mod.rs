//! # Application Layer
//!
//! Use case orchestration and application services.
//!
//! This layer coordinates domain objects inside ledger transactions and
//! talks to the outside world through ports.
//!
//! ## Use Cases
//!
//! - [`SettlementOrchestrator`]: buy, take bid and the settlement callbacks
//! - [`ListingService`]: asks and bids
//! - [`ShareService`]: issuance and price
//! - [`AccountService`]: registration and card activation
//! - [`StalePendingMonitor`]: long-pending operation report
//!
//! ## Services
//!
//! - [`ReservationManager`]: inventory reservation on asks and bids
//! - [`OperationLedger`]: operation state machine
//! - [`AccountGate`]: activation precondition

pub mod error;
pub mod services;
pub mod use_cases;

pub use error::{ApplicationError, ApplicationResult};
pub use services::{AccountGate, OperationLedger, ReservationManager, StoreAccountGate};
pub use use_cases::{
    AccountService, BuyRequest, CallbackOutcome, CardCheckPublisher, CardVerdictOutcome,
    CreateAskRequest, CreateBidRequest, IssueShareRequest, ListingPolicy, ListingService,
    PaymentRequestPublisher, RegisterAccountRequest, SettlementOrchestrator, ShareService,
    StalePendingMonitor, TakeBidRequest,
};
