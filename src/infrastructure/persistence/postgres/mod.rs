//! # PostgreSQL Ledger Store
//!
//! PostgreSQL implementation of the ledger store port using sqlx.

pub mod ledger_store;
pub mod schema;

#[cfg(test)]
mod tests;

pub use ledger_store::PgLedgerStore;
pub use schema::ensure_schema;
