//! # Reservation Manager
//!
//! Reserves and releases inventory on asks and bids.
//!
//! Every method runs inside the caller's transaction and starts by
//! locking the target row, so reservations and compensations on the same
//! ask or bid are totally ordered.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::domain::entities::{Ask, Bid};
use crate::domain::value_objects::{AskId, BidId, Quantity, Timestamp};
use crate::infrastructure::persistence::traits::LedgerTransaction;
use tracing::{debug, info};

/// Stateless reservation logic over a ledger transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReservationManager;

impl ReservationManager {
    /// Creates a reservation manager.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Takes `amount` shares off an ask.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the ask is missing or removed
    /// - `InsufficientInventory` if fewer than `amount` shares are left
    pub async fn reserve_from_ask(
        &self,
        tx: &mut dyn LedgerTransaction,
        ask_id: AskId,
        amount: Quantity,
    ) -> ApplicationResult<Ask> {
        let mut ask = tx
            .lock_ask(ask_id)
            .await?
            .filter(|ask| !ask.is_removed())
            .ok_or_else(|| ApplicationError::not_found("ask", ask_id))?;

        if ask.amount() < amount {
            return Err(ApplicationError::insufficient_inventory(amount, ask.amount()));
        }
        ask.reserve(amount)?;
        tx.update_ask(&ask).await?;

        debug!(ask_id = %ask_id, %amount, remaining = %ask.amount(), "reserved from ask");
        Ok(ask)
    }

    /// Takes `amount` shares off a bid.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the bid is missing
    /// - `Removed` if the creator removed it
    /// - `Expired` if it is past its expiry
    /// - `InsufficientInventory` if fewer than `amount` shares are still wanted
    pub async fn reserve_from_bid(
        &self,
        tx: &mut dyn LedgerTransaction,
        bid_id: BidId,
        amount: Quantity,
    ) -> ApplicationResult<Bid> {
        let mut bid = tx
            .lock_bid(bid_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("bid", bid_id))?;

        if bid.is_removed() {
            return Err(ApplicationError::Removed(format!("bid {bid_id}")));
        }
        if bid.is_expired_at(Timestamp::now()) {
            return Err(ApplicationError::Expired(format!("bid {bid_id}")));
        }
        if bid.amount() < amount {
            return Err(ApplicationError::insufficient_inventory(amount, bid.amount()));
        }
        bid.reserve(amount)?;
        tx.update_bid(&bid).await?;

        debug!(bid_id = %bid_id, %amount, remaining = %bid.amount(), "reserved from bid");
        Ok(bid)
    }

    /// Puts `amount` shares back on an ask.
    ///
    /// Returns `false` without touching the row if the ask was removed in
    /// the meantime.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the ask row does not exist at all.
    pub async fn release_to_ask(
        &self,
        tx: &mut dyn LedgerTransaction,
        ask_id: AskId,
        amount: Quantity,
    ) -> ApplicationResult<bool> {
        let mut ask = tx
            .lock_ask(ask_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("ask", ask_id))?;

        if ask.is_removed() {
            info!(ask_id = %ask_id, %amount, "ask removed, reservation not restored");
            return Ok(false);
        }
        ask.release(amount)?;
        tx.update_ask(&ask).await?;

        debug!(ask_id = %ask_id, %amount, remaining = %ask.amount(), "released to ask");
        Ok(true)
    }

    /// Puts `amount` shares back on a bid.
    ///
    /// Returns `false` without touching the row if the bid was removed in
    /// the meantime. Expired bids are still restored; they simply stay
    /// inactive.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the bid row does not exist at all.
    pub async fn release_to_bid(
        &self,
        tx: &mut dyn LedgerTransaction,
        bid_id: BidId,
        amount: Quantity,
    ) -> ApplicationResult<bool> {
        let mut bid = tx
            .lock_bid(bid_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("bid", bid_id))?;

        if bid.is_removed() {
            info!(bid_id = %bid_id, %amount, "bid removed, reservation not restored");
            return Ok(false);
        }
        bid.release(amount)?;
        tx.update_bid(&bid).await?;

        debug!(bid_id = %bid_id, %amount, remaining = %bid.amount(), "released to bid");
        Ok(true)
    }
}
