//! # Messaging Errors
//!
//! Errors raised by the broker port and by inbound message handlers.

use thiserror::Error;

/// Error type for broker operations.
#[derive(Debug, Clone, Error)]
pub enum MessagingError {
    /// Broker unreachable or bus closed.
    #[error("connection error: {0}")]
    Connection(String),

    /// A message could not be published.
    #[error("publish error: {0}")]
    Publish(String),

    /// A subscription could not be established.
    #[error("subscribe error: {0}")]
    Subscribe(String),

    /// A payload could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl MessagingError {
    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a publish error.
    #[must_use]
    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish(msg.into())
    }

    /// Creates a subscribe error.
    #[must_use]
    pub fn subscribe(msg: impl Into<String>) -> Self {
        Self::Subscribe(msg.into())
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

/// Result type for broker operations.
pub type MessagingResult<T> = Result<T, MessagingError>;

/// Outcome of a failed inbound message.
///
/// Decides whether the message is acknowledged: a payload that can never
/// be processed is dropped, anything else is left for redelivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// Payload is malformed; retrying cannot help.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Processing failed; the message must be redelivered.
    #[error("processing failed: {0}")]
    Processing(String),
}

impl HandlerError {
    /// Creates a malformed-payload error.
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Creates a processing error.
    #[must_use]
    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing(msg.into())
    }

    /// True if the message should be acknowledged anyway.
    #[inline]
    #[must_use]
    pub const fn should_ack(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_malformed_is_acked() {
        assert!(HandlerError::malformed("bad json").should_ack());
        assert!(!HandlerError::processing("db down").should_ack());
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(
            MessagingError::publish("timeout").to_string(),
            "publish error: timeout"
        );
    }
}
