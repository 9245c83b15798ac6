//! # Domain Layer
//!
//! Core business logic following Domain-Driven Design principles.
//!
//! This layer contains:
//! - **Entities**: Operation, Ask, Bid, Ownership, Account, Share
//! - **Value Objects**: Quantity, Price, identifiers, payment secrets
//! - **Events**: Messages exchanged with the payment processor and card validator
//! - **Errors**: Domain-specific error types

pub mod entities;
pub mod errors;
pub mod events;
pub mod value_objects;
