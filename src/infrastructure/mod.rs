//! # Infrastructure Layer
//!
//! External adapters and implementations of application ports.
//!
//! ## Persistence
//!
//! Ledger store implementations:
//! - PostgreSQL with row locks and per-transaction isolation levels
//! - In-memory store for tests and local runs
//!
//! ## Messaging
//!
//! Broker adapters and consumers:
//! - Redis Streams consumer groups
//! - In-memory bus that models ack and redelivery
//! - Publisher for payment and card-check requests
//! - Consumers for settlement results and card verdicts

pub mod messaging;
pub mod persistence;
