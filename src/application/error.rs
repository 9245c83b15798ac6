//! # Application Errors
//!
//! Error types for the application layer.
//!
//! These errors represent business rule violations surfaced to callers of
//! the use cases, plus the infrastructure failures that abort them. Every
//! error aborts the enclosing transaction.

use crate::domain::errors::DomainError;
use crate::domain::value_objects::Quantity;
use crate::infrastructure::messaging::MessagingError;
use crate::infrastructure::persistence::traits::RepositoryError;
use std::fmt;
use thiserror::Error;

/// Application layer error.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Entity missing, or soft-deleted where the caller needs it live.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// Identifier looked up.
        id: String,
    },

    /// The ask or bid has fewer shares left than requested.
    #[error("insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory {
        /// Amount asked for.
        requested: Quantity,
        /// Amount left on the listing or proposal.
        available: Quantity,
    },

    /// The seller does not hold enough uncommitted shares.
    #[error("insufficient ownership: requested {requested}, available {available}")]
    InsufficientOwnership {
        /// Amount asked for.
        requested: Quantity,
        /// Shares held minus shares already listed or pending.
        available: Quantity,
    },

    /// A party to the trade has no verified card.
    #[error("account not activated: {0}")]
    NotActivated(String),

    /// Buyer and seller are the same account.
    #[error("self trade: {0}")]
    SelfTrade(String),

    /// The bid is past its expiry.
    #[error("expired: {0}")]
    Expired(String),

    /// The bid was removed by its creator.
    #[error("removed: {0}")]
    Removed(String),

    /// Caller may not act on this entity.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A per-account limit would be exceeded.
    #[error("limit reached: {0}")]
    LimitReached(String),

    /// A unique attribute is already taken.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Request validation failed.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Stored state contradicts a pending operation; needs manual attention.
    #[error("settlement inconsistency: {0}")]
    SettlementInconsistency(String),

    /// The store failed; the caller (or broker) may retry.
    #[error("transient store failure: {0}")]
    TransientStoreFailure(String),

    /// A concurrent transaction changed a locked row first.
    #[error("concurrent update: {0}")]
    ConcurrentUpdate(String),

    /// Outbound message could not be published.
    #[error("messaging error: {0}")]
    Messaging(String),

    /// Domain error.
    #[error("domain error: {0}")]
    DomainError(#[from] DomainError),
}

impl ApplicationError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Creates an insufficient-inventory error.
    #[must_use]
    pub fn insufficient_inventory(requested: Quantity, available: Quantity) -> Self {
        Self::InsufficientInventory {
            requested,
            available,
        }
    }

    /// Creates an insufficient-ownership error.
    #[must_use]
    pub fn insufficient_ownership(requested: Quantity, available: Quantity) -> Self {
        Self::InsufficientOwnership {
            requested,
            available,
        }
    }

    /// Creates a not-activated error.
    #[must_use]
    pub fn not_activated(account: impl fmt::Display) -> Self {
        Self::NotActivated(account.to_string())
    }

    /// Creates a forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// Creates a settlement-inconsistency error.
    #[must_use]
    pub fn settlement_inconsistency(message: impl Into<String>) -> Self {
        Self::SettlementInconsistency(message.into())
    }

    /// True for failures worth retrying without changing the request.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransientStoreFailure(_) | Self::ConcurrentUpdate(_) | Self::Messaging(_)
        )
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepositoryError::Conflict(msg) => Self::AlreadyExists(msg),
            RepositoryError::ConcurrentUpdate(msg) => Self::ConcurrentUpdate(msg),
            other => Self::TransientStoreFailure(other.to_string()),
        }
    }
}

impl From<MessagingError> for ApplicationError {
    fn from(err: MessagingError) -> Self {
        Self::Messaging(err.to_string())
    }
}

/// Result type for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
