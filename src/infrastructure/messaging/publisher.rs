//! # Bus Publisher
//!
//! Adapts the outbound application ports to a [`MessageBus`].
//!
//! Payment requests are keyed by operation id and card checks by account
//! id, so every message for one entity lands on the same partition.

use super::traits::{MessageBus, publish_json};
use crate::application::error::ApplicationResult;
use crate::application::use_cases::{CardCheckPublisher, PaymentRequestPublisher};
use crate::domain::events::{CardCheckRequested, ChargeCardRequested, RedeemCodeRequested, Topic};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Publishes domain events as JSON on the bus.
#[derive(Debug, Clone)]
pub struct BusPublisher {
    bus: Arc<dyn MessageBus>,
}

impl BusPublisher {
    /// Creates a publisher over `bus`.
    #[must_use]
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl PaymentRequestPublisher for BusPublisher {
    async fn publish_charge_card(&self, request: &ChargeCardRequested) -> ApplicationResult<()> {
        let key = request.operation_id.to_string();
        publish_json(self.bus.as_ref(), Topic::ChargeCard, &key, request).await?;
        debug!(operation_id = %key, amount = %request.amount, "charge-card published");
        Ok(())
    }

    async fn publish_redeem_code(&self, request: &RedeemCodeRequested) -> ApplicationResult<()> {
        let key = request.operation_id.to_string();
        publish_json(self.bus.as_ref(), Topic::RedeemCode, &key, request).await?;
        debug!(operation_id = %key, amount = %request.amount, "redeem-code published");
        Ok(())
    }
}

#[async_trait]
impl CardCheckPublisher for BusPublisher {
    async fn publish_card_check(&self, request: &CardCheckRequested) -> ApplicationResult<()> {
        let key = request.account_id.to_string();
        publish_json(self.bus.as_ref(), Topic::CardCheck, &key, request).await?;
        debug!(account_id = %key, "card-check published");
        Ok(())
    }
}
