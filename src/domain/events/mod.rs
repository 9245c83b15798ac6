//! # Domain Events
//!
//! Messages the ledger exchanges with external services.
//!
//! ## Payment Events
//!
//! - `ChargeCardRequested`: buyer card charge for an ask purchase
//! - `RedeemCodeRequested`: prepaid code redemption for a taken bid
//! - `SettlementResult`: payment processor verdict
//!
//! ## Account Events
//!
//! - `CardCheckRequested`: card number awaiting verification
//! - `CardVerified`: card validator verdict

pub mod account_events;
pub mod payment_events;
pub mod topic;

pub use account_events::{CardCheckRequested, CardVerified};
pub use payment_events::{ChargeCardRequested, RedeemCodeRequested, SettlementResult};
pub use topic::Topic;
