//! # Account Entity
//!
//! A trading account and its card-activation state.
//!
//! An account may trade only while `activated`. Changing the card number
//! deactivates it at once; only a matching verification verdict from the
//! external card validator re-activates it.

use crate::domain::value_objects::{AccountId, AccountRole, CardNumber};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A trading account.
///
/// # Examples
///
/// ```
/// use share_ledger::domain::entities::account::Account;
/// use share_ledger::domain::value_objects::{AccountId, AccountRole, CardNumber};
///
/// let mut account = Account::new(AccountId::new_v4(), "ann@example.com", "Ann", AccountRole::User);
/// let card = CardNumber::new("4111111111111111").unwrap();
///
/// account.change_card(card.clone());
/// assert!(!account.is_activated());
///
/// assert!(account.activate_with(&card));
/// assert!(account.is_activated());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    email: String,
    name: String,
    role: AccountRole,
    card_number: Option<CardNumber>,
    activated: bool,
}

impl Account {
    /// Creates a new account with no card, not activated.
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
            card_number: None,
            activated: false,
        }
    }

    /// Reconstructs an account from storage.
    #[must_use]
    pub fn from_parts(
        id: AccountId,
        email: String,
        name: String,
        role: AccountRole,
        card_number: Option<CardNumber>,
        activated: bool,
    ) -> Self {
        Self {
            id,
            email,
            name,
            role,
            card_number,
            activated,
        }
    }

    /// Stores a new card number and deactivates the account until the
    /// card is verified.
    pub fn change_card(&mut self, card_number: CardNumber) {
        self.card_number = Some(card_number);
        self.activated = false;
    }

    /// Activates the account if `verified` is the card currently on file.
    ///
    /// Returns false (and leaves the account untouched) for a stale verdict.
    pub fn activate_with(&mut self, verified: &CardNumber) -> bool {
        if self.card_number.as_ref() != Some(verified) {
            return false;
        }
        self.activated = true;
        true
    }

    /// Account ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Contact email (unique).
    #[inline]
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Display name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role.
    #[inline]
    #[must_use]
    pub fn role(&self) -> AccountRole {
        self.role
    }

    /// Card currently on file.
    #[inline]
    #[must_use]
    pub fn card_number(&self) -> Option<&CardNumber> {
        self.card_number.as_ref()
    }

    /// True if the account may trade.
    #[inline]
    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.activated
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account({} {})", self.id, self.role)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account::new(AccountId::new_v4(), "a@b.c", "A", AccountRole::User)
    }

    #[test]
    fn new_account_is_inactive_without_card() {
        let acc = account();
        assert!(!acc.is_activated());
        assert!(acc.card_number().is_none());
    }

    #[test]
    fn card_change_deactivates() {
        let mut acc = account();
        let first = CardNumber::new("4111111111111111").unwrap();
        acc.change_card(first.clone());
        assert!(acc.activate_with(&first));

        acc.change_card(CardNumber::new("5500000000000004").unwrap());
        assert!(!acc.is_activated());
    }

    #[test]
    fn stale_verdict_is_ignored() {
        let mut acc = account();
        let old = CardNumber::new("4111111111111111").unwrap();
        let new = CardNumber::new("5500000000000004").unwrap();
        acc.change_card(old.clone());
        acc.change_card(new.clone());

        assert!(!acc.activate_with(&old));
        assert!(!acc.is_activated());
        assert!(acc.activate_with(&new));
    }

    #[test]
    fn verdict_without_card_on_file_is_ignored() {
        let mut acc = account();
        assert!(!acc.activate_with(&CardNumber::new("4111111111111111").unwrap()));
    }
}
