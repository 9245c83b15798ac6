//! # Value Objects
//!
//! Immutable types with validation and domain semantics.
//!
//! ## Identity Types
//!
//! - [`AccountId`], [`ShareId`], [`AskId`], [`BidId`], [`OperationId`]: UUID-based identifiers
//!
//! ## Numeric Types
//!
//! - [`Quantity`]: whole-share count with checked arithmetic
//! - [`Price`]: strictly positive decimal price
//!
//! ## Arithmetic
//!
//! - [`ArithmeticError`]: Error type for arithmetic failures
//! - [`CheckedArithmetic`]: Trait for safe arithmetic operations
//!
//! ## Payment Types
//!
//! - [`CardNumber`], [`PaymentCard`], [`PaymentCode`]: secrets sent to the payment processor
//!
//! ## State and Enums
//!
//! - [`OperationStatus`]: trade lifecycle state machine
//! - [`AccountRole`]: role of an account
//! - [`IsolationLevel`]: transaction isolation
//! - [`Timestamp`]: UTC instant

pub mod account_role;
pub mod arithmetic;
pub mod ids;
pub mod isolation;
pub mod operation_status;
pub mod payment;
pub mod price;
pub mod quantity;
pub mod timestamp;

#[cfg(test)]
mod tests;

pub use account_role::AccountRole;
pub use arithmetic::{ArithmeticError, ArithmeticResult, CheckedArithmetic};
pub use ids::{AccountId, AskId, BidId, OperationId, ShareId};
pub use isolation::IsolationLevel;
pub use operation_status::{InvalidOperationStatusError, OperationStatus};
pub use payment::{CardNumber, PaymentCard, PaymentCode};
pub use price::Price;
pub use quantity::Quantity;
pub use timestamp::Timestamp;
