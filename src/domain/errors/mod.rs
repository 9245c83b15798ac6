//! # Domain Errors
//!
//! Typed error types for domain operations.
//!
//! Error codes are organized by category:
//! - 1000-1999: Validation errors
//! - 2000-2999: State errors
//! - 4000-4999: Arithmetic errors
//!
//! # Examples
//!
//! ```
//! use share_ledger::domain::errors::{DomainError, DomainResult};
//!
//! fn validate_ticker(ticker: &str) -> DomainResult<&str> {
//!     if ticker.is_empty() {
//!         return Err(DomainError::InvalidTicker("ticker cannot be empty".to_string()));
//!     }
//!     Ok(ticker)
//! }
//!
//! assert!(validate_ticker("").is_err());
//! ```

pub mod arithmetic_error;
pub mod domain_error;

pub use arithmetic_error::ArithmeticError;
pub use domain_error::{DomainError, DomainResult};
