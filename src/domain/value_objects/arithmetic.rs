//! # Checked Arithmetic
//!
//! Overflow-safe arithmetic shared by the quantity and price value objects.
//!
//! Share balances are integers and money totals are decimals; both must
//! fail loudly instead of wrapping or going negative.

use thiserror::Error;

/// Error raised by checked arithmetic on value objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    /// Result exceeded the representable range.
    #[error("arithmetic overflow")]
    Overflow,

    /// Result would have gone below zero.
    #[error("arithmetic underflow")]
    Underflow,

    /// The input value was outside the accepted domain.
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),
}

/// Result type for checked arithmetic.
pub type ArithmeticResult<T> = Result<T, ArithmeticError>;

/// Checked addition and subtraction for value objects.
pub trait CheckedArithmetic: Sized {
    /// Adds `rhs`, failing on overflow.
    ///
    /// # Errors
    ///
    /// Returns [`ArithmeticError::Overflow`] if the result is not representable.
    fn safe_add(self, rhs: Self) -> ArithmeticResult<Self>;

    /// Subtracts `rhs`, failing if the result would be negative.
    ///
    /// # Errors
    ///
    /// Returns [`ArithmeticError::Underflow`] if `rhs` is larger than `self`.
    fn safe_sub(self, rhs: Self) -> ArithmeticResult<Self>;
}
