//! # In-Memory Message Bus
//!
//! Broker double for tests and local runs.
//!
//! Published messages are recorded, not routed: tests inspect them with
//! [`InMemoryMessageBus::published`] and play the external service's role
//! by calling [`InMemoryMessageBus::deliver`]. A delivery whose handler
//! asks for redelivery stays pending until
//! [`InMemoryMessageBus::redeliver_pending`] is called.

use super::error::{MessagingError, MessagingResult};
use super::traits::{InboundMessage, MessageBus, MessageHandler};
use crate::domain::events::Topic;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// A message recorded by [`InMemoryMessageBus::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Destination topic.
    pub topic: Topic,
    /// Message key.
    pub key: String,
    /// Raw payload.
    pub payload: Vec<u8>,
}

/// What happened to a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Every handler accepted (or dropped as malformed) the message.
    Acked,
    /// At least one handler asked for redelivery.
    Pending,
    /// No handler is subscribed to the topic.
    Unrouted,
}

#[derive(Debug, Default)]
struct BusState {
    published: Vec<PublishedMessage>,
    handlers: HashMap<Topic, Vec<Arc<dyn MessageHandler>>>,
    pending: Vec<InboundMessage>,
    fail_publish: bool,
    closed: bool,
}

/// In-memory implementation of [`MessageBus`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageBus {
    state: Arc<Mutex<BusState>>,
}

impl InMemoryMessageBus {
    /// Creates an open bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent publish fail (or succeed again).
    pub async fn set_fail_publish(&self, fail: bool) {
        self.state.lock().await.fail_publish = fail;
    }

    /// Messages published on `topic`, oldest first.
    pub async fn published(&self, topic: Topic) -> Vec<PublishedMessage> {
        self.state
            .lock()
            .await
            .published
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Messages published on `topic`, decoded as `T`.
    ///
    /// # Errors
    ///
    /// Returns `MessagingError::Serialization` if a payload does not decode.
    pub async fn published_json<T: DeserializeOwned>(&self, topic: Topic) -> MessagingResult<Vec<T>> {
        self.published(topic)
            .await
            .iter()
            .map(|m| {
                serde_json::from_slice(&m.payload)
                    .map_err(|e| MessagingError::serialization(e.to_string()))
            })
            .collect()
    }

    /// Number of delivered messages waiting for redelivery.
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Delivers a raw message to the topic's subscribers.
    ///
    /// # Errors
    ///
    /// Returns `MessagingError::Connection` if the bus is closed.
    pub async fn deliver(
        &self,
        topic: Topic,
        key: &str,
        payload: Vec<u8>,
    ) -> MessagingResult<DeliveryOutcome> {
        let message = InboundMessage {
            topic,
            key: Some(key.to_owned()),
            payload,
            redelivered: false,
        };
        self.dispatch(message).await
    }

    /// Serializes `message` and delivers it.
    ///
    /// # Errors
    ///
    /// Returns `MessagingError::Serialization` if encoding fails.
    pub async fn deliver_json<T: Serialize + Sync>(
        &self,
        topic: Topic,
        key: &str,
        message: &T,
    ) -> MessagingResult<DeliveryOutcome> {
        let payload =
            serde_json::to_vec(message).map_err(|e| MessagingError::serialization(e.to_string()))?;
        self.deliver(topic, key, payload).await
    }

    /// Redelivers every pending message once; returns one outcome per message.
    ///
    /// # Errors
    ///
    /// Returns `MessagingError::Connection` if the bus is closed.
    pub async fn redeliver_pending(&self) -> MessagingResult<Vec<DeliveryOutcome>> {
        let pending = std::mem::take(&mut self.state.lock().await.pending);
        let mut outcomes = Vec::with_capacity(pending.len());
        for mut message in pending {
            message.redelivered = true;
            outcomes.push(self.dispatch(message).await?);
        }
        Ok(outcomes)
    }

    async fn dispatch(&self, message: InboundMessage) -> MessagingResult<DeliveryOutcome> {
        let handlers = {
            let state = self.state.lock().await;
            if state.closed {
                return Err(MessagingError::connection("bus closed"));
            }
            state.handlers.get(&message.topic).cloned().unwrap_or_default()
        };
        if handlers.is_empty() {
            return Ok(DeliveryOutcome::Unrouted);
        }

        let mut acked = true;
        for handler in &handlers {
            match handler.handle(&message).await {
                Ok(()) => {}
                Err(err) if err.should_ack() => {
                    error!(topic = %message.topic, error = %err, "dropping malformed message");
                }
                Err(err) => {
                    warn!(topic = %message.topic, error = %err, "message left for redelivery");
                    acked = false;
                }
            }
        }

        if acked {
            debug!(topic = %message.topic, "message acked");
            return Ok(DeliveryOutcome::Acked);
        }
        self.state.lock().await.pending.push(message);
        Ok(DeliveryOutcome::Pending)
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn publish(&self, topic: Topic, key: &str, payload: &[u8]) -> MessagingResult<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(MessagingError::connection("bus closed"));
        }
        if state.fail_publish {
            return Err(MessagingError::publish(format!("broker rejected {topic}")));
        }
        state.published.push(PublishedMessage {
            topic,
            key: key.to_owned(),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: Topic,
        handler: Arc<dyn MessageHandler>,
    ) -> MessagingResult<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(MessagingError::subscribe("bus closed"));
        }
        state.handlers.entry(topic).or_default().push(handler);
        Ok(())
    }

    async fn close(&self) -> MessagingResult<()> {
        let mut state = self.state.lock().await;
        state.closed = true;
        state.handlers.clear();
        Ok(())
    }
}
