//! # Account Events
//!
//! Card verification round trip with the external card validator.

use crate::domain::value_objects::{AccountId, CardNumber};
use serde::{Deserialize, Serialize};

/// Request to verify a newly stored card number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardCheckRequested {
    /// Account whose card changed.
    pub account_id: AccountId,
    /// Card to verify.
    pub card_number: CardNumber,
}

/// Verdict of the card validator.
///
/// Only applied if `card_number` still matches the card on file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardVerified {
    /// Account the verdict is for.
    pub account_id: AccountId,
    /// Card that was checked.
    pub card_number: CardNumber,
    /// True if the card is usable.
    pub valid: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn verdict_parses_camel_case() {
        let account = AccountId::new_v4();
        let raw = format!(
            r#"{{"accountId":"{account}","cardNumber":"4111111111111111","valid":true}}"#
        );
        let verdict: CardVerified = serde_json::from_str(&raw).unwrap();
        assert_eq!(verdict.account_id, account);
        assert!(verdict.valid);
    }

    #[test]
    fn verdict_with_malformed_card_is_rejected() {
        let raw = format!(
            r#"{{"accountId":"{}","cardNumber":"abc","valid":true}}"#,
            AccountId::new_v4()
        );
        assert!(serde_json::from_str::<CardVerified>(&raw).is_err());
    }
}
