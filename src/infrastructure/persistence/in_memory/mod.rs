//! # In-Memory Persistence
//!
//! Ledger store backed by process memory, used by tests and local runs.

pub mod ledger_store;

pub use ledger_store::InMemoryLedgerStore;
