//! # Inbound Consumers
//!
//! Message handlers that feed broker events into the use cases.
//!
//! A payload that cannot be decoded is dropped. Any failure of the use
//! case leaves the message unacknowledged; the use cases are idempotent,
//! so redelivery is always safe.

use super::error::{HandlerError, MessagingResult};
use super::traits::{InboundMessage, MessageBus, MessageHandler};
use crate::application::error::ApplicationError;
use crate::application::use_cases::{AccountService, SettlementOrchestrator};
use crate::domain::events::{CardVerified, SettlementResult, Topic};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Consumes `settlement-result` verdicts.
#[derive(Debug, Clone)]
pub struct SettlementResultConsumer {
    orchestrator: Arc<SettlementOrchestrator>,
}

impl SettlementResultConsumer {
    /// Creates a consumer driving `orchestrator`.
    #[must_use]
    pub fn new(orchestrator: Arc<SettlementOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl MessageHandler for SettlementResultConsumer {
    async fn handle(&self, message: &InboundMessage) -> Result<(), HandlerError> {
        let result: SettlementResult = message.decode()?;
        let outcome = self
            .orchestrator
            .on_settlement_result(&result)
            .await
            .map_err(|e| processing_failure(message, &e))?;
        debug!(
            operation_id = %result.operation_id,
            succeeded = result.succeeded,
            redelivered = message.redelivered,
            ?outcome,
            "settlement result handled"
        );
        Ok(())
    }
}

/// Consumes `card-verified` verdicts.
#[derive(Debug, Clone)]
pub struct CardVerifiedConsumer {
    accounts: Arc<AccountService>,
}

impl CardVerifiedConsumer {
    /// Creates a consumer driving `accounts`.
    #[must_use]
    pub fn new(accounts: Arc<AccountService>) -> Self {
        Self { accounts }
    }
}

#[async_trait]
impl MessageHandler for CardVerifiedConsumer {
    async fn handle(&self, message: &InboundMessage) -> Result<(), HandlerError> {
        let verdict: CardVerified = message.decode()?;
        let outcome = self
            .accounts
            .on_card_verified(&verdict)
            .await
            .map_err(|e| processing_failure(message, &e))?;
        debug!(account_id = %verdict.account_id, ?outcome, "card verdict handled");
        Ok(())
    }
}

fn processing_failure(message: &InboundMessage, err: &ApplicationError) -> HandlerError {
    if matches!(err, ApplicationError::SettlementInconsistency(_)) {
        error!(topic = %message.topic, key = ?message.key, error = %err, "settlement needs manual attention");
    } else {
        warn!(topic = %message.topic, key = ?message.key, error = %err, "inbound message failed");
    }
    HandlerError::processing(err.to_string())
}

/// Subscribes both consumers on `bus`.
///
/// # Errors
///
/// Returns `MessagingError::Subscribe` if the bus refuses a subscription.
pub async fn subscribe_all(
    bus: &dyn MessageBus,
    orchestrator: Arc<SettlementOrchestrator>,
    accounts: Arc<AccountService>,
) -> MessagingResult<()> {
    bus.subscribe(
        Topic::SettlementResult,
        Arc::new(SettlementResultConsumer::new(orchestrator)),
    )
    .await?;
    bus.subscribe(Topic::CardVerified, Arc::new(CardVerifiedConsumer::new(accounts)))
        .await?;
    Ok(())
}
