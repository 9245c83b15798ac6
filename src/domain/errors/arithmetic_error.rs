//! # Arithmetic Errors
//!
//! Re-export of [`ArithmeticError`] so callers handling domain failures
//! find every error type under `domain::errors`.

pub use crate::domain::value_objects::arithmetic::ArithmeticError;
