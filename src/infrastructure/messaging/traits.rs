//! # Message Bus Port
//!
//! Publish/subscribe contract over an external broker.
//!
//! Delivery is at least once and unordered across keys. A handler that
//! returns `Ok` (or a [`HandlerError::Malformed`]) gets its message
//! acknowledged; a [`HandlerError::Processing`] leaves the message pending
//! so the broker redelivers it.

use super::error::{HandlerError, MessagingError, MessagingResult};
use crate::domain::events::Topic;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// A message received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Topic the message arrived on.
    pub topic: Topic,
    /// Partitioning key, if the producer set one.
    pub key: Option<String>,
    /// Raw payload.
    pub payload: Vec<u8>,
    /// True if this is not the first delivery.
    pub redelivered: bool,
}

impl InboundMessage {
    /// Decodes the JSON payload.
    ///
    /// # Errors
    ///
    /// Returns `HandlerError::Malformed` if the payload does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| HandlerError::malformed(format!("{} payload: {e}", self.topic)))
    }
}

/// Consumer of one topic.
#[async_trait]
pub trait MessageHandler: Send + Sync + fmt::Debug {
    /// Processes one message.
    async fn handle(&self, message: &InboundMessage) -> Result<(), HandlerError>;
}

/// Broker client.
#[async_trait]
pub trait MessageBus: Send + Sync + fmt::Debug {
    /// Publishes `payload` on `topic` under `key`.
    async fn publish(&self, topic: Topic, key: &str, payload: &[u8]) -> MessagingResult<()>;

    /// Starts delivering `topic` to `handler` on its own task.
    async fn subscribe(&self, topic: Topic, handler: Arc<dyn MessageHandler>)
    -> MessagingResult<()>;

    /// Stops every subscription and releases the connection.
    async fn close(&self) -> MessagingResult<()>;
}

/// Serializes `message` as JSON and publishes it.
///
/// # Errors
///
/// Returns `MessagingError::Serialization` if encoding fails, or whatever
/// the bus returns from `publish`.
pub async fn publish_json<T: Serialize + Sync>(
    bus: &dyn MessageBus,
    topic: Topic,
    key: &str,
    message: &T,
) -> MessagingResult<()> {
    let payload =
        serde_json::to_vec(message).map_err(|e| MessagingError::serialization(e.to_string()))?;
    bus.publish(topic, key, &payload).await
}
