//! # Redis Streams Message Bus
//!
//! [`MessageBus`] over Redis Streams consumer groups.
//!
//! Each topic maps to one stream (`{prefix}{topic}`). Publishing is an
//! `XADD` with `key` and `payload` fields. Each subscription runs one task
//! that reads new entries through `XREADGROUP` (id `>`) and acknowledges
//! with `XACK` only after the handler accepted the message.
//!
//! Unacknowledged entries stay in the group's pending list. Between reads
//! the task sweeps that list (`XPENDING`): entries idle for at least
//! `retry_backoff_ms` are claimed (`XCLAIM`) and handled again, and an
//! entry delivered `max_deliveries` times is copied to
//! `{stream}{dead_letter_suffix}` and acknowledged. A failing entry
//! therefore never holds back the entries behind it, and entries left by a
//! crashed consumer are picked up by the survivors.

use super::error::{MessagingError, MessagingResult};
use super::traits::{InboundMessage, MessageBus, MessageHandler};
use crate::config::BrokerConfig;
use crate::domain::events::Topic;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use redis::streams::{
    StreamClaimReply, StreamId, StreamPendingCountReply, StreamPendingId, StreamReadOptions,
    StreamReadReply,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Redis Streams implementation of [`MessageBus`].
pub struct RedisStreamsBus {
    client: redis::Client,
    publisher: MultiplexedConnection,
    config: BrokerConfig,
    shutdown: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for RedisStreamsBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStreamsBus")
            .field("stream_prefix", &self.config.stream_prefix)
            .field("consumer_group", &self.config.consumer_group)
            .field("consumer_name", &self.config.consumer_name)
            .finish_non_exhaustive()
    }
}

impl RedisStreamsBus {
    /// Connects to Redis.
    ///
    /// # Errors
    ///
    /// Returns `MessagingError::Connection` if the URL is invalid or the
    /// server is unreachable.
    pub async fn connect(config: BrokerConfig) -> MessagingResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())
            .map_err(|e| MessagingError::connection(e.to_string()))?;
        let publisher = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| MessagingError::connection(e.to_string()))?;
        let (shutdown, _) = watch::channel(false);
        info!(prefix = %config.stream_prefix, group = %config.consumer_group, "connected to redis");
        Ok(Self {
            client,
            publisher,
            config,
            shutdown,
            workers: Mutex::new(Vec::new()),
        })
    }

    fn stream_key(&self, topic: Topic) -> String {
        format!("{}{}", self.config.stream_prefix, topic)
    }

    async fn ensure_group(&self, con: &mut MultiplexedConnection, stream: &str) -> MessagingResult<()> {
        let created: redis::RedisResult<()> = con
            .xgroup_create_mkstream(stream, &self.config.consumer_group, "0")
            .await;
        match created {
            Ok(()) => Ok(()),
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(MessagingError::subscribe(e.to_string())),
        }
    }
}

#[async_trait]
impl MessageBus for RedisStreamsBus {
    async fn publish(&self, topic: Topic, key: &str, payload: &[u8]) -> MessagingResult<()> {
        if *self.shutdown.borrow() {
            return Err(MessagingError::connection("bus closed"));
        }
        let stream = self.stream_key(topic);
        let mut con = self.publisher.clone();
        let fields: [(&str, &[u8]); 2] = [("key", key.as_bytes()), ("payload", payload)];
        let entry_id: String = con
            .xadd(&stream, "*", &fields)
            .await
            .map_err(|e| MessagingError::publish(e.to_string()))?;
        debug!(stream = %stream, key, entry_id = %entry_id, "published");
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: Topic,
        handler: Arc<dyn MessageHandler>,
    ) -> MessagingResult<()> {
        let stream = self.stream_key(topic);
        let mut con = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| MessagingError::subscribe(e.to_string()))?;
        self.ensure_group(&mut con, &stream).await?;

        let worker = StreamWorker {
            con,
            topic,
            stream,
            config: self.config.clone(),
            handler,
            shutdown: self.shutdown.subscribe(),
        };
        info!(topic = %topic, "subscription started");
        self.workers.lock().await.push(tokio::spawn(worker.run()));
        Ok(())
    }

    async fn close(&self) -> MessagingResult<()> {
        self.shutdown.send_replace(true);
        let workers = std::mem::take(&mut *self.workers.lock().await);
        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "subscription task ended abnormally");
            }
        }
        info!("redis bus closed");
        Ok(())
    }
}

struct StreamWorker {
    con: MultiplexedConnection,
    topic: Topic,
    stream: String,
    config: BrokerConfig,
    handler: Arc<dyn MessageHandler>,
    shutdown: watch::Receiver<bool>,
}

impl StreamWorker {
    async fn run(mut self) {
        let backoff = Duration::from_millis(self.config.retry_backoff_ms);
        let mut last_sweep: Option<Instant> = None;

        loop {
            if *self.shutdown.borrow() {
                break;
            }
            // Entries left by a previous run are swept on the first pass
            if last_sweep.map_or(true, |at| at.elapsed() >= backoff) {
                self.sweep_pending().await;
                last_sweep = Some(Instant::now());
            }

            let options = StreamReadOptions::default()
                .group(&self.config.consumer_group, &self.config.consumer_name)
                .count(self.config.batch_size)
                .block(self.config.block_ms as usize);

            let mut con = self.con.clone();
            let streams = [self.stream.as_str()];
            let ids = [">"];
            let read = tokio::select! {
                _ = self.shutdown.changed() => break,
                read = con.xread_options::<_, _, StreamReadReply>(&streams, &ids, &options) => read,
            };

            let entries: Vec<StreamId> = match read {
                Ok(reply) => reply.keys.into_iter().flat_map(|k| k.ids).collect(),
                Err(e) => {
                    warn!(topic = %self.topic, error = %e, "stream read failed");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            };

            for entry in &entries {
                if self.process(entry, false).await {
                    self.ack(&entry.id).await;
                }
            }
        }
        debug!(topic = %self.topic, "subscription stopped");
    }

    /// Redelivers or dead-letters the group's overdue pending entries.
    async fn sweep_pending(&self) {
        let mut con = self.con.clone();
        let reply: redis::RedisResult<StreamPendingCountReply> = con
            .xpending_count(
                &self.stream,
                &self.config.consumer_group,
                "-",
                "+",
                self.config.batch_size,
            )
            .await;
        let pending: Vec<PendingEntry> = match reply {
            Ok(reply) => reply.ids.iter().map(PendingEntry::from).collect(),
            Err(e) => {
                warn!(topic = %self.topic, error = %e, "pending list read failed");
                return;
            }
        };

        let plan = plan_pending(
            &pending,
            self.config.retry_backoff_ms,
            self.config.max_deliveries,
        );
        if !plan.dead.is_empty() {
            self.dead_letter(&plan.dead).await;
        }
        if plan.retry.is_empty() {
            return;
        }
        for entry in self.claim(&plan.retry).await {
            if self.process(&entry, true).await {
                self.ack(&entry.id).await;
            }
        }
    }

    /// Takes over idle pending entries for this consumer.
    async fn claim(&self, ids: &[String]) -> Vec<StreamId> {
        let mut con = self.con.clone();
        let claimed: redis::RedisResult<StreamClaimReply> = con
            .xclaim(
                &self.stream,
                &self.config.consumer_group,
                &self.config.consumer_name,
                self.config.retry_backoff_ms,
                ids,
            )
            .await;
        match claimed {
            Ok(reply) => reply.ids,
            Err(e) => {
                warn!(topic = %self.topic, error = %e, "claim failed");
                Vec::new()
            }
        }
    }

    /// Copies entries to the dead-letter stream and acknowledges them.
    async fn dead_letter(&self, ids: &[String]) {
        let dead_stream = format!("{}{}", self.stream, self.config.dead_letter_suffix);
        for entry in self.claim(ids).await {
            let key = entry.get::<Vec<u8>>("key").unwrap_or_default();
            let payload = entry.get::<Vec<u8>>("payload").unwrap_or_default();
            let fields: [(&str, &[u8]); 3] = [
                ("key", key.as_slice()),
                ("payload", payload.as_slice()),
                ("source_id", entry.id.as_bytes()),
            ];
            let mut con = self.con.clone();
            let moved: redis::RedisResult<String> = con.xadd(&dead_stream, "*", &fields).await;
            match moved {
                Ok(_) => {
                    error!(
                        topic = %self.topic,
                        entry_id = %entry.id,
                        dead_letter = %dead_stream,
                        max_deliveries = self.config.max_deliveries,
                        "entry moved to dead letter"
                    );
                    self.ack(&entry.id).await;
                }
                Err(e) => {
                    warn!(topic = %self.topic, entry_id = %entry.id, error = %e, "dead-letter move failed");
                }
            }
        }
    }

    /// Returns true if the entry should be acknowledged.
    async fn process(&self, entry: &StreamId, redelivered: bool) -> bool {
        let Some(payload) = entry.get::<Vec<u8>>("payload") else {
            error!(topic = %self.topic, entry_id = %entry.id, "entry without payload dropped");
            return true;
        };
        let message = InboundMessage {
            topic: self.topic,
            key: entry.get::<String>("key"),
            payload,
            redelivered,
        };
        match self.handler.handle(&message).await {
            Ok(()) => true,
            Err(err) if err.should_ack() => {
                error!(topic = %self.topic, entry_id = %entry.id, error = %err, "dropping malformed message");
                true
            }
            Err(err) => {
                warn!(topic = %self.topic, entry_id = %entry.id, error = %err, "message left for redelivery");
                false
            }
        }
    }

    async fn ack(&self, entry_id: &str) {
        let mut con = self.con.clone();
        let acked: redis::RedisResult<u64> = con
            .xack(&self.stream, &self.config.consumer_group, &[entry_id])
            .await;
        if let Err(e) = acked {
            // The entry stays pending and is swept again; handlers are idempotent.
            warn!(topic = %self.topic, entry_id, error = %e, "ack failed");
        }
    }
}

/// One row of the group's pending list.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingEntry {
    id: String,
    idle_ms: u64,
    deliveries: usize,
}

impl From<&StreamPendingId> for PendingEntry {
    fn from(pending: &StreamPendingId) -> Self {
        Self {
            id: pending.id.clone(),
            idle_ms: u64::try_from(pending.last_delivered_ms).unwrap_or(u64::MAX),
            deliveries: pending.times_delivered,
        }
    }
}

/// Pending entries split by what the sweep does with them.
#[derive(Debug, Default, PartialEq, Eq)]
struct PendingPlan {
    retry: Vec<String>,
    dead: Vec<String>,
}

/// Entries idle for `min_idle_ms` are retried, or dead-lettered once they
/// have been delivered `max_deliveries` times. Busy entries are left alone.
fn plan_pending(pending: &[PendingEntry], min_idle_ms: u64, max_deliveries: usize) -> PendingPlan {
    let mut plan = PendingPlan::default();
    for entry in pending.iter().filter(|entry| entry.idle_ms >= min_idle_ms) {
        if entry.deliveries >= max_deliveries {
            plan.dead.push(entry.id.clone());
        } else {
            plan.retry.push(entry.id.clone());
        }
    }
    plan
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::infrastructure::messaging::error::HandlerError;

    fn pending(id: &str, idle_ms: u64, deliveries: usize) -> PendingEntry {
        PendingEntry {
            id: id.to_string(),
            idle_ms,
            deliveries,
        }
    }

    // ========================================================================
    // Pending sweep planning
    // ========================================================================

    mod planning {
        use super::*;

        #[test]
        fn idle_entries_are_retried() {
            let plan = plan_pending(&[pending("1-0", 1500, 1), pending("2-0", 10, 1)], 1000, 5);
            assert_eq!(plan.retry, vec!["1-0".to_string()]);
            assert!(plan.dead.is_empty());
        }

        #[test]
        fn exhausted_entries_are_dead_lettered() {
            let plan = plan_pending(&[pending("1-0", 2000, 5), pending("2-0", 2000, 4)], 1000, 5);
            assert_eq!(plan.dead, vec!["1-0".to_string()]);
            assert_eq!(plan.retry, vec!["2-0".to_string()]);
        }

        #[test]
        fn busy_exhausted_entry_waits() {
            let plan = plan_pending(&[pending("1-0", 0, 9)], 1000, 5);
            assert_eq!(plan, PendingPlan::default());
        }

        #[test]
        fn converts_reply_rows() {
            let row = StreamPendingId {
                id: "7-1".to_string(),
                consumer: "ledger-1".to_string(),
                last_delivered_ms: 250,
                times_delivered: 3,
            };
            assert_eq!(PendingEntry::from(&row), pending("7-1", 250, 3));
        }
    }

    // ========================================================================
    // Against a live Redis (TEST_REDIS_URL)
    // ========================================================================

    mod live {
        use super::*;
        use redis::streams::StreamRangeReply;

        /// Fails every `poison` payload and records the rest.
        #[derive(Debug, Default)]
        struct PoisonHandler {
            seen: std::sync::Mutex<Vec<Vec<u8>>>,
        }

        #[async_trait]
        impl MessageHandler for PoisonHandler {
            async fn handle(&self, message: &InboundMessage) -> Result<(), HandlerError> {
                if message.payload == b"poison" {
                    return Err(HandlerError::processing("store unavailable"));
                }
                self.seen.lock().unwrap().push(message.payload.clone());
                Ok(())
            }
        }

        fn test_config() -> Option<BrokerConfig> {
            let redis_url = std::env::var("TEST_REDIS_URL").ok()?;
            Some(BrokerConfig {
                redis_url,
                stream_prefix: format!("test-{}:", uuid::Uuid::new_v4()),
                consumer_group: "ledger-test".to_string(),
                consumer_name: "ledger-test-1".to_string(),
                batch_size: 16,
                block_ms: 50,
                retry_backoff_ms: 50,
                max_deliveries: 3,
                dead_letter_suffix: ":dead-letter".to_string(),
            })
        }

        macro_rules! config_or_skip {
            () => {
                match test_config() {
                    Some(config) => config,
                    None => {
                        eprintln!("Skipping test: TEST_REDIS_URL not set");
                        return;
                    }
                }
            };
        }

        async fn wait_until<F, Fut>(mut done: F)
        where
            F: FnMut() -> Fut,
            Fut: std::future::Future<Output = bool>,
        {
            for _ in 0..100 {
                if done().await {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            panic!("condition not reached within 5s");
        }

        #[tokio::test]
        #[ignore = "requires Redis server"]
        async fn failing_head_entry_does_not_block_later_entries() {
            let config = config_or_skip!();
            let bus = RedisStreamsBus::connect(config).await.unwrap();
            let handler = Arc::new(PoisonHandler::default());
            bus.subscribe(Topic::SettlementResult, handler.clone())
                .await
                .unwrap();

            bus.publish(Topic::SettlementResult, "k", b"poison").await.unwrap();
            bus.publish(Topic::SettlementResult, "k", b"first").await.unwrap();
            bus.publish(Topic::SettlementResult, "k", b"second").await.unwrap();

            let seen = &handler.seen;
            wait_until(move || async move { seen.lock().unwrap().len() == 2 }).await;
            assert_eq!(
                *handler.seen.lock().unwrap(),
                vec![b"first".to_vec(), b"second".to_vec()]
            );
            bus.close().await.unwrap();
        }

        #[tokio::test]
        #[ignore = "requires Redis server"]
        async fn exhausted_entry_moves_to_dead_letter() {
            let config = config_or_skip!();
            let dead_stream = format!(
                "{}{}{}",
                config.stream_prefix,
                Topic::SettlementResult,
                config.dead_letter_suffix
            );
            let client = redis::Client::open(config.redis_url.as_str()).unwrap();
            let bus = RedisStreamsBus::connect(config).await.unwrap();
            bus.subscribe(Topic::SettlementResult, Arc::new(PoisonHandler::default()))
                .await
                .unwrap();
            bus.publish(Topic::SettlementResult, "op-1", b"poison").await.unwrap();

            let con = client.get_multiplexed_async_connection().await.unwrap();
            let stream = dead_stream.as_str();
            wait_until(move || {
                let mut con = con.clone();
                async move {
                    let len: usize = con.xlen(stream).await.unwrap();
                    len == 1
                }
            })
            .await;

            let mut con = client.get_multiplexed_async_connection().await.unwrap();
            let moved: StreamRangeReply = con.xrange_all(&dead_stream).await.unwrap();
            assert_eq!(moved.ids[0].get::<Vec<u8>>("payload").unwrap(), b"poison");
            assert_eq!(moved.ids[0].get::<String>("key").unwrap(), "op-1");
            bus.close().await.unwrap();
        }
    }
}
