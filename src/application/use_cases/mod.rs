//! # Use Cases
//!
//! Application use cases implementing business workflows.
//!
//! Each use case opens its own ledger transaction, composes the
//! application services inside it and commits only if every step succeeded.

pub mod accounts;
pub mod listings;
pub mod settlement;
pub mod shares;
pub mod stale_pending;


pub use accounts::{AccountService, CardCheckPublisher, CardVerdictOutcome, RegisterAccountRequest};
pub use listings::{
    CreateAskRequest, CreateBidRequest, DEFAULT_BID_LIFETIME_DAYS, DEFAULT_MAX_ACTIVE_BIDS,
    ListingPolicy, ListingService,
};
pub use settlement::{
    BuyRequest, CallbackOutcome, PaymentRequestPublisher, SettlementOrchestrator, TakeBidRequest,
};
pub use shares::{IssueShareRequest, ShareService};
pub use stale_pending::StalePendingMonitor;
