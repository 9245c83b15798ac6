//! # Application Services
//!
//! Building blocks the use cases compose inside a ledger transaction.
//!
//! - [`ReservationManager`]: reserve / release on asks and bids
//! - [`OperationLedger`]: operation creation and status changes
//! - [`AccountGate`]: activation precondition
//! - [`finish`]: commit on success, roll back on error
//! - [`retry_on_conflict`]: rerun a transaction that lost a row race

pub mod account_gate;
pub mod operation_ledger;
pub mod reservation;
pub mod transaction;


pub use account_gate::{AccountGate, StoreAccountGate};
pub use operation_ledger::OperationLedger;
pub use reservation::ReservationManager;
pub use transaction::{MAX_CONFLICT_ATTEMPTS, finish, retry_on_conflict};
