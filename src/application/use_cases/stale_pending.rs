//! # Stale Pending Monitor
//!
//! Periodically reports operations that have waited too long for their
//! payment verdict. It never changes them: a late verdict is still applied.

use crate::application::error::ApplicationResult;
use crate::application::services::{OperationLedger, finish};
use crate::domain::entities::Operation;
use crate::domain::value_objects::{IsolationLevel, Timestamp};
use crate::infrastructure::persistence::traits::LedgerStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Reports long-pending operations.
#[derive(Debug)]
pub struct StalePendingMonitor {
    store: Arc<dyn LedgerStore>,
    operations: OperationLedger,
    warning_age: chrono::Duration,
    interval: Duration,
}

impl StalePendingMonitor {
    /// Creates a monitor that flags operations older than `warning_age`
    /// every `interval`.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, warning_age: Duration, interval: Duration) -> Self {
        Self {
            store,
            operations: OperationLedger::new(),
            warning_age: chrono::Duration::from_std(warning_age)
                .unwrap_or(chrono::Duration::MAX),
            interval,
        }
    }

    /// Runs one scan and logs every stale operation.
    ///
    /// # Errors
    ///
    /// Returns `TransientStoreFailure` if the store fails.
    pub async fn scan_once(&self) -> ApplicationResult<Vec<Operation>> {
        let cutoff = Timestamp::now().sub_duration(self.warning_age);
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let result = self
            .operations
            .find_pending_created_before(tx.as_mut(), cutoff)
            .await;
        let stale = finish(tx, result).await?;

        for operation in &stale {
            warn!(
                operation_id = %operation.id(),
                origin = %operation.origin(),
                created_at = %operation.created_at(),
                amount = %operation.amount(),
                "operation still pending payment"
            );
        }
        debug!(count = stale.len(), %cutoff, "stale pending scan finished");
        Ok(stale)
    }

    /// Scans every interval until `shutdown` flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        info!(interval_secs = self.interval.as_secs(), "stale pending monitor started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.scan_once().await {
                        error!(error = %e, "stale pending scan failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("stale pending monitor stopped");
    }
}
