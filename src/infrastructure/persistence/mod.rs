//! # Persistence Layer
//!
//! The transactional ledger store port and its implementations.

pub mod in_memory;
pub mod postgres;
pub mod traits;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::{PgLedgerStore, ensure_schema};
pub use traits::{LedgerStore, LedgerTransaction, RepositoryError, RepositoryResult};
