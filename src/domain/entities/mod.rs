//! # Domain Entities
//!
//! Aggregates of the share ledger.
//!
//! ## Aggregates
//!
//! - [`Operation`]: trade record with its settlement state machine
//! - [`Ask`]: sale listing
//! - [`Bid`]: buy proposal
//! - [`Ownership`]: per account × share balance
//!
//! ## Entities
//!
//! - [`Account`]: trading account and card activation
//! - [`Share`]: issued security

pub mod account;
pub mod ask;
pub mod bid;
pub mod operation;
pub mod ownership;
pub mod share;


pub use account::Account;
pub use ask::Ask;
pub use bid::Bid;
pub use operation::{Operation, OperationOrigin};
pub use ownership::Ownership;
pub use share::Share;
