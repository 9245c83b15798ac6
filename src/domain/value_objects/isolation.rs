//! # Isolation Level
//!
//! Transaction isolation requested from the ledger store.

use std::fmt;

/// Isolation level of a ledger transaction.
///
/// Reservations and settlement run at `RepeatableRead`; compensation and
/// bid creation run at `ReadCommitted`. Under `RepeatableRead` a read-only
/// row lock does not refresh the snapshot, so checks there rely on locks
/// that write the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IsolationLevel {
    /// Each statement sees data committed before it began.
    #[default]
    ReadCommitted,
    /// All statements see the snapshot taken at the first statement.
    RepeatableRead,
    /// Full serializability.
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling of the level.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}
