//! # Topics
//!
//! Broker topics the ledger publishes to or consumes from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A message broker topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    /// Outbound: charge a buyer's card for an ask purchase.
    ChargeCard,
    /// Outbound: redeem a bid's prepaid payment code.
    RedeemCode,
    /// Inbound: payment processor verdict for an operation.
    SettlementResult,
    /// Outbound: ask the card validator to verify a new card number.
    CardCheck,
    /// Inbound: card validator verdict.
    CardVerified,
}

impl Topic {
    /// All topics.
    pub const ALL: [Self; 5] = [
        Self::ChargeCard,
        Self::RedeemCode,
        Self::SettlementResult,
        Self::CardCheck,
        Self::CardVerified,
    ];

    /// Wire name of the topic.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ChargeCard => "charge-card",
            Self::RedeemCode => "redeem-code",
            Self::SettlementResult => "settlement-result",
            Self::CardCheck => "card-check",
            Self::CardVerified => "card-verified",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| format!("unknown topic: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for topic in Topic::ALL {
            assert_eq!(topic.as_str().parse::<Topic>().unwrap(), topic);
        }
    }

    #[test]
    fn serde_matches_wire_name() {
        let json = serde_json::to_string(&Topic::SettlementResult).unwrap();
        assert_eq!(json, "\"settlement-result\"");
    }
}
