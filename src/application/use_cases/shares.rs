//! # Shares
//!
//! Issuance and price management, restricted to the issuing company.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::finish;
use crate::domain::entities::Share;
use crate::domain::value_objects::{AccountId, IsolationLevel, Price, Quantity, ShareId};
use crate::infrastructure::persistence::traits::{LedgerStore, LedgerTransaction};
use std::sync::Arc;
use tracing::{info, instrument};

/// Request to issue a new share.
#[derive(Debug, Clone)]
pub struct IssueShareRequest {
    /// Issuing company account.
    pub issuer_id: AccountId,
    /// Ticker; stored lower-case.
    pub ticker: String,
    /// Display name.
    pub name: String,
    /// Initial price.
    pub price: Price,
    /// Shares credited to the issuer.
    pub amount: Quantity,
}

impl IssueShareRequest {
    /// Creates a new issuance request.
    #[must_use]
    pub fn new(
        issuer_id: AccountId,
        ticker: impl Into<String>,
        name: impl Into<String>,
        price: Price,
        amount: Quantity,
    ) -> Self {
        Self {
            issuer_id,
            ticker: ticker.into(),
            name: name.into(),
            price,
            amount,
        }
    }
}

/// Issues shares and manages their price.
#[derive(Debug)]
pub struct ShareService {
    store: Arc<dyn LedgerStore>,
}

impl ShareService {
    /// Creates a new share service.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Issues a share and credits the whole amount to the issuer.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the issuer does not exist
    /// - `Forbidden` if the issuer is not a company
    /// - `AlreadyExists` if the ticker is taken
    /// - `DomainError` if the ticker is malformed
    #[instrument(skip(self, request), fields(issuer_id = %request.issuer_id, ticker = %request.ticker))]
    pub async fn issue_share(&self, request: IssueShareRequest) -> ApplicationResult<ShareId> {
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let result = Self::issue_in(tx.as_mut(), &request).await;
        let share_id = finish(tx, result).await?;
        info!(share_id = %share_id, amount = %request.amount, "share issued");
        Ok(share_id)
    }

    async fn issue_in(
        tx: &mut dyn LedgerTransaction,
        request: &IssueShareRequest,
    ) -> ApplicationResult<ShareId> {
        let issuer = tx
            .find_account(request.issuer_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("account", request.issuer_id))?;
        if !issuer.role().can_issue_shares() {
            return Err(ApplicationError::forbidden(format!(
                "{} accounts cannot issue shares",
                issuer.role()
            )));
        }

        let share = Share::new(
            request.issuer_id,
            &request.ticker,
            request.name.clone(),
            request.price,
        )?;
        if tx.find_share_by_ticker(share.ticker()).await?.is_some() {
            return Err(ApplicationError::AlreadyExists(format!(
                "ticker {}",
                share.ticker()
            )));
        }
        tx.insert_share(&share).await?;
        if request.amount.is_positive() {
            tx.credit_ownership(request.issuer_id, share.id(), request.amount)
                .await?;
        }
        Ok(share.id())
    }

    /// Issues more of an existing share to its issuer.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if `amount` is zero
    /// - `NotFound` if the share does not exist
    /// - `Forbidden` if `issuer_id` did not issue it
    #[instrument(skip(self))]
    pub async fn add_shares(
        &self,
        issuer_id: AccountId,
        share_id: ShareId,
        amount: Quantity,
    ) -> ApplicationResult<Quantity> {
        if amount.is_zero() {
            return Err(ApplicationError::validation("amount must be positive"));
        }
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let result: ApplicationResult<Quantity> = async {
            Self::issued_share(tx.as_mut(), issuer_id, share_id).await?;
            let ownership = tx.credit_ownership(issuer_id, share_id, amount).await?;
            Ok(ownership.amount())
        }
        .await;
        let held = finish(tx, result).await?;
        info!(%held, "shares added");
        Ok(held)
    }

    /// Sets the market price of a share.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the share does not exist
    /// - `Forbidden` if `issuer_id` did not issue it
    #[instrument(skip(self))]
    pub async fn update_price(
        &self,
        issuer_id: AccountId,
        share_id: ShareId,
        price: Price,
    ) -> ApplicationResult<()> {
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let result: ApplicationResult<()> = async {
            let mut share = Self::issued_share(tx.as_mut(), issuer_id, share_id).await?;
            share.update_price(price);
            tx.update_share(&share).await?;
            Ok(())
        }
        .await;
        finish(tx, result).await?;
        info!(%price, "share price updated");
        Ok(())
    }

    /// Locks a share and checks who issued it.
    async fn issued_share(
        tx: &mut dyn LedgerTransaction,
        issuer_id: AccountId,
        share_id: ShareId,
    ) -> ApplicationResult<Share> {
        let share = tx
            .lock_share(share_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("share", share_id))?;
        if !share.is_issued_by(issuer_id) {
            return Err(ApplicationError::forbidden(format!(
                "share {share_id} was issued by another account"
            )));
        }
        Ok(share)
    }
}
