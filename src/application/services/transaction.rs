//! Commit-or-rollback and conflict-retry helpers shared by the use cases.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::infrastructure::persistence::traits::LedgerTransaction;
use std::future::Future;
use tracing::{debug, warn};

/// Attempts made by [`retry_on_conflict`] before giving up.
pub const MAX_CONFLICT_ATTEMPTS: u32 = 5;

/// Commits `tx` if `result` is `Ok`, rolls it back otherwise.
///
/// A failed rollback is logged; the original error is returned.
///
/// # Errors
///
/// Returns the error carried by `result`, or the commit failure.
pub async fn finish<T>(
    tx: Box<dyn LedgerTransaction>,
    result: ApplicationResult<T>,
) -> ApplicationResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, original = %err, "rollback failed");
            }
            Err(err)
        }
    }
}

/// Runs `attempt` again while it fails with `ConcurrentUpdate`.
///
/// Each call must open and finish its own transaction. After
/// [`MAX_CONFLICT_ATTEMPTS`] the last conflict is returned.
///
/// # Errors
///
/// Returns the first non-conflict error, or the last conflict.
pub async fn retry_on_conflict<T, F, Fut>(mut attempt: F) -> ApplicationResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApplicationResult<T>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Err(ApplicationError::ConcurrentUpdate(reason)) if tries < MAX_CONFLICT_ATTEMPTS => {
                debug!(tries, %reason, "lost row race, retrying");
                tries += 1;
            }
            other => return other,
        }
    }
}
