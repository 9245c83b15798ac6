//! # Domain Errors
//!
//! Typed domain error definitions.
//!
//! This module provides the [`DomainError`] enum for representing
//! domain-level errors with numeric error codes.
//!
//! # Error Code Ranges
//!
//! - **1000-1999**: Validation errors
//! - **2000-2999**: State errors
//! - **4000-4999**: Arithmetic errors
//!
//! # Examples
//!
//! ```
//! use share_ledger::domain::errors::DomainError;
//!
//! let error = DomainError::InvalidQuantity("amount must be positive".to_string());
//! assert_eq!(error.code(), 1001);
//! ```

use crate::domain::value_objects::arithmetic::ArithmeticError;
use crate::domain::value_objects::operation_status::OperationStatus;
use crate::domain::value_objects::quantity::Quantity;
use thiserror::Error;

/// Domain-level error with numeric error codes.
///
/// | Range | Category |
/// |-------|----------|
/// | 1000-1999 | Validation errors |
/// | 2000-2999 | State errors |
/// | 4000-4999 | Arithmetic errors |
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    // ========================================================================
    // Validation Errors (1000-1999)
    // ========================================================================
    /// Invalid quantity value.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Invalid price value.
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    /// Invalid share ticker.
    #[error("invalid ticker: {0}")]
    InvalidTicker(String),

    /// Malformed card number.
    #[error("invalid card number: {0}")]
    InvalidCardNumber(String),

    /// Malformed payment card details.
    #[error("invalid payment card: {0}")]
    InvalidPaymentCard(String),

    /// Malformed payment code.
    #[error("invalid payment code: {0}")]
    InvalidPaymentCode(String),

    /// Generic validation failure.
    #[error("validation error: {0}")]
    ValidationError(String),

    // ========================================================================
    // State Errors (2000-2999)
    // ========================================================================
    /// Operation status transition forbidden by the state machine.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current status.
        from: OperationStatus,
        /// Requested status.
        to: OperationStatus,
    },

    /// Not enough shares left on a listing, proposal or balance.
    #[error("insufficient quantity: requested {requested}, available {available}")]
    InsufficientQuantity {
        /// Amount asked for.
        requested: Quantity,
        /// Amount actually available.
        available: Quantity,
    },

    /// The listing or proposal was soft-deleted.
    #[error("already removed: {0}")]
    AlreadyRemoved(String),

    // ========================================================================
    // Arithmetic Errors (4000-4999)
    // ========================================================================
    /// Arithmetic overflow.
    #[error("arithmetic overflow")]
    Overflow,

    /// Arithmetic underflow.
    #[error("arithmetic underflow")]
    Underflow,

    /// Value outside the accepted domain.
    #[error("invalid arithmetic value: {0}")]
    InvalidArithmeticValue(String),
}

impl DomainError {
    /// Returns the numeric error code.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::InvalidQuantity(_) => 1001,
            Self::InvalidPrice(_) => 1002,
            Self::InvalidTicker(_) => 1003,
            Self::InvalidCardNumber(_) => 1004,
            Self::InvalidPaymentCard(_) => 1005,
            Self::InvalidPaymentCode(_) => 1006,
            Self::ValidationError(_) => 1099,

            Self::InvalidStateTransition { .. } => 2001,
            Self::InsufficientQuantity { .. } => 2002,
            Self::AlreadyRemoved(_) => 2003,

            Self::Overflow => 4001,
            Self::Underflow => 4002,
            Self::InvalidArithmeticValue(_) => 4004,
        }
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.code() {
            1000..=1999 => "validation",
            2000..=2999 => "state",
            4000..=4999 => "arithmetic",
            _ => "unknown",
        }
    }

    /// Returns true if this is a validation error.
    #[inline]
    #[must_use]
    pub const fn is_validation_error(&self) -> bool {
        matches!(self.code(), 1000..=1999)
    }

    /// Returns true if this is a state error.
    #[inline]
    #[must_use]
    pub const fn is_state_error(&self) -> bool {
        matches!(self.code(), 2000..=2999)
    }
}

impl From<ArithmeticError> for DomainError {
    fn from(err: ArithmeticError) -> Self {
        match err {
            ArithmeticError::Overflow => Self::Overflow,
            ArithmeticError::Underflow => Self::Underflow,
            ArithmeticError::InvalidValue(msg) => Self::InvalidArithmeticValue(msg.to_string()),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod error_codes {
        use super::*;

        #[test]
        fn validation_errors_in_range() {
            let errors = [
                DomainError::InvalidQuantity("test".to_string()),
                DomainError::InvalidPrice("test".to_string()),
                DomainError::InvalidTicker("test".to_string()),
                DomainError::InvalidCardNumber("test".to_string()),
                DomainError::InvalidPaymentCard("test".to_string()),
                DomainError::InvalidPaymentCode("test".to_string()),
                DomainError::ValidationError("test".to_string()),
            ];

            for error in errors {
                assert!(error.is_validation_error(), "{error} should be validation");
                assert_eq!(error.category(), "validation");
            }
        }

        #[test]
        fn state_errors_in_range() {
            let errors = [
                DomainError::InvalidStateTransition {
                    from: OperationStatus::Succeed,
                    to: OperationStatus::Rejected,
                },
                DomainError::InsufficientQuantity {
                    requested: Quantity::new(2),
                    available: Quantity::new(1),
                },
                DomainError::AlreadyRemoved("ask".to_string()),
            ];

            for error in errors {
                assert!(error.is_state_error(), "{error} should be state");
                assert_eq!(error.category(), "state");
            }
        }

        #[test]
        fn arithmetic_errors_in_range() {
            for error in [DomainError::Overflow, DomainError::Underflow] {
                assert_eq!(error.category(), "arithmetic");
            }
        }
    }

    mod display {
        use super::*;

        #[test]
        fn state_transition_error_display() {
            let error = DomainError::InvalidStateTransition {
                from: OperationStatus::Succeed,
                to: OperationStatus::Rejected,
            };
            assert_eq!(
                error.to_string(),
                "invalid state transition from Succeed to Rejected"
            );
        }

        #[test]
        fn insufficient_quantity_display() {
            let error = DomainError::InsufficientQuantity {
                requested: Quantity::new(31),
                available: Quantity::new(30),
            };
            assert_eq!(
                error.to_string(),
                "insufficient quantity: requested 31, available 30"
            );
        }
    }

    mod from_arithmetic_error {
        use super::*;

        #[test]
        fn maps_each_variant() {
            assert_eq!(DomainError::from(ArithmeticError::Overflow), DomainError::Overflow);
            assert_eq!(DomainError::from(ArithmeticError::Underflow), DomainError::Underflow);
            assert_eq!(
                DomainError::from(ArithmeticError::InvalidValue("x")),
                DomainError::InvalidArithmeticValue("x".to_string())
            );
        }
    }
}
