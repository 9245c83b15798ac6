//! # Messaging
//!
//! Broker port, its adapters and the inbound consumers.
//!
//! - [`MessageBus`] / [`MessageHandler`]: the port
//! - [`RedisStreamsBus`]: production broker over Redis Streams
//! - [`InMemoryMessageBus`]: broker double for tests and local runs
//! - [`BusPublisher`]: outbound payment and card-check requests
//! - [`SettlementResultConsumer`], [`CardVerifiedConsumer`]: inbound verdicts

pub mod consumers;
pub mod error;
pub mod in_memory;
pub mod publisher;
pub mod redis_streams;
pub mod traits;

pub use consumers::{CardVerifiedConsumer, SettlementResultConsumer, subscribe_all};
pub use error::{HandlerError, MessagingError, MessagingResult};
pub use in_memory::{DeliveryOutcome, InMemoryMessageBus, PublishedMessage};
pub use publisher::BusPublisher;
pub use redis_streams::RedisStreamsBus;
pub use traits::{InboundMessage, MessageBus, MessageHandler, publish_json};
