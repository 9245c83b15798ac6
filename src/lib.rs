//! # Share Ledger
//!
//! Share-trading ledger: sale listings (asks), buy proposals (bids), and an
//! asynchronous settlement saga against external payment services.
//!
//! ## Architecture
//!
//! This crate follows Domain-Driven Design with a layered architecture:
//!
//! - **Domain Layer** (`domain`): entities, value objects and broker payloads
//! - **Application Layer** (`application`): reservation, the settlement
//!   orchestrator and the listing, share and account use cases
//! - **Infrastructure Layer** (`infrastructure`): PostgreSQL and in-memory
//!   ledger stores, Redis Streams and in-memory message buses
//!
//! A trade reserves inventory and records a `PendingPayment` operation in one
//! transaction, then asks the payment service to charge or redeem. The
//! verdict arrives later on the `settlement-result` topic and either
//! transfers the shares or releases the reservation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use share_ledger::application::use_cases::{BuyRequest, SettlementOrchestrator};
//!
//! let operation = orchestrator
//!     .buy(BuyRequest::new(buyer, ask, Quantity::new(30), card))
//!     .await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
