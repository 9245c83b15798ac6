//! # Accounts
//!
//! Registration and card-based activation.
//!
//! Changing the card deactivates the account on the spot and sends the
//! number out for verification. The account is activated again only when a
//! positive verdict arrives for the card that is still on file.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::finish;
use crate::domain::entities::Account;
use crate::domain::events::{CardCheckRequested, CardVerified};
use crate::domain::value_objects::{AccountId, AccountRole, CardNumber, IsolationLevel};
use crate::infrastructure::persistence::traits::{LedgerStore, LedgerTransaction};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outbound port for card verification requests.
#[async_trait]
pub trait CardCheckPublisher: Send + Sync + fmt::Debug {
    /// Asks the card validator to check a number.
    async fn publish_card_check(&self, request: &CardCheckRequested) -> ApplicationResult<()>;
}

/// Request to register an account.
#[derive(Debug, Clone)]
pub struct RegisterAccountRequest {
    /// Identifier assigned by the identity provider.
    pub id: AccountId,
    /// Unique email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role.
    pub role: AccountRole,
}

impl RegisterAccountRequest {
    /// Creates a new registration request.
    #[must_use]
    pub fn new(
        id: AccountId,
        email: impl Into<String>,
        name: impl Into<String>,
        role: AccountRole,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            name: name.into(),
            role,
        }
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if email or name is blank, or the email
    /// has no `@`.
    pub fn validate(&self) -> ApplicationResult<()> {
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(ApplicationError::validation("email is invalid"));
        }
        if self.name.trim().is_empty() {
            return Err(ApplicationError::validation("name cannot be empty"));
        }
        Ok(())
    }
}

/// What a card verdict did to the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardVerdictOutcome {
    /// The account may trade again.
    Activated,
    /// The validator rejected the card; the account stays inactive.
    Rejected,
    /// The verdict is for a card no longer on file.
    Stale,
    /// No such account.
    UnknownAccount,
}

/// Account lifecycle.
#[derive(Debug)]
pub struct AccountService {
    store: Arc<dyn LedgerStore>,
    publisher: Arc<dyn CardCheckPublisher>,
}

impl AccountService {
    /// Creates a new account service.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, publisher: Arc<dyn CardCheckPublisher>) -> Self {
        Self { store, publisher }
    }

    /// Registers an account with no card, not activated.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if the request is malformed
    /// - `AlreadyExists` if the id or email is taken
    #[instrument(skip(self, request), fields(account_id = %request.id))]
    pub async fn register_account(&self, request: RegisterAccountRequest) -> ApplicationResult<Account> {
        request.validate()?;
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let result = Self::register_in(tx.as_mut(), request).await;
        let account = finish(tx, result).await?;
        info!(role = %account.role(), "account registered");
        Ok(account)
    }

    async fn register_in(
        tx: &mut dyn LedgerTransaction,
        request: RegisterAccountRequest,
    ) -> ApplicationResult<Account> {
        if tx.find_account(request.id).await?.is_some() {
            return Err(ApplicationError::AlreadyExists(format!("account {}", request.id)));
        }
        if tx.find_account_by_email(&request.email).await?.is_some() {
            return Err(ApplicationError::AlreadyExists(format!(
                "email {}",
                request.email
            )));
        }
        let account = Account::new(request.id, request.email, request.name, request.role);
        tx.insert_account(&account).await?;
        Ok(account)
    }

    /// Stores a new card, deactivates the account and requests verification.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the account does not exist
    /// - `AlreadyExists` if another account holds the card
    /// - `Messaging` if the verification request cannot be published
    #[instrument(skip(self, card_number), fields(card = %card_number.last_four()))]
    pub async fn update_card_number(
        &self,
        account_id: AccountId,
        card_number: CardNumber,
    ) -> ApplicationResult<()> {
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let result = self.change_card_in(tx.as_mut(), account_id, card_number).await;
        finish(tx, result).await?;
        info!(account_id = %account_id, "card changed, account deactivated pending verification");
        Ok(())
    }

    async fn change_card_in(
        &self,
        tx: &mut dyn LedgerTransaction,
        account_id: AccountId,
        card_number: CardNumber,
    ) -> ApplicationResult<()> {
        let mut account = tx
            .lock_account(account_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("account", account_id))?;
        if let Some(holder) = tx.find_account_by_card(&card_number).await?
            && holder.id() != account_id
        {
            return Err(ApplicationError::AlreadyExists(format!(
                "card ending {}",
                card_number.last_four()
            )));
        }

        account.change_card(card_number.clone());
        tx.update_account(&account).await?;

        let request = CardCheckRequested {
            account_id,
            card_number,
        };
        self.publisher.publish_card_check(&request).await
    }

    /// Applies a card validator verdict.
    ///
    /// # Errors
    ///
    /// Returns `TransientStoreFailure` if the store fails.
    #[instrument(skip(self, verdict), fields(account_id = %verdict.account_id, valid = verdict.valid))]
    pub async fn on_card_verified(&self, verdict: &CardVerified) -> ApplicationResult<CardVerdictOutcome> {
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let result = Self::apply_verdict_in(tx.as_mut(), verdict).await;
        let outcome = finish(tx, result).await?;
        match outcome {
            CardVerdictOutcome::Activated => info!("account activated"),
            CardVerdictOutcome::Rejected => info!("card rejected, account stays inactive"),
            CardVerdictOutcome::Stale => info!("verdict for a replaced card ignored"),
            CardVerdictOutcome::UnknownAccount => warn!("verdict for unknown account ignored"),
        }
        Ok(outcome)
    }

    async fn apply_verdict_in(
        tx: &mut dyn LedgerTransaction,
        verdict: &CardVerified,
    ) -> ApplicationResult<CardVerdictOutcome> {
        let Some(mut account) = tx.lock_account(verdict.account_id).await? else {
            return Ok(CardVerdictOutcome::UnknownAccount);
        };
        if account.card_number() != Some(&verdict.card_number) {
            return Ok(CardVerdictOutcome::Stale);
        }
        if !verdict.valid {
            return Ok(CardVerdictOutcome::Rejected);
        }
        account.activate_with(&verdict.card_number);
        tx.update_account(&account).await?;
        Ok(CardVerdictOutcome::Activated)
    }
}
