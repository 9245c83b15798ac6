//! # Account Role
//!
//! Coarse role assigned to an account by the identity service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of an account.
///
/// Only `Company` accounts may issue shares; every role can trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    /// Platform administrator.
    Admin,
    /// Regular trader.
    #[default]
    User,
    /// Bank representative.
    Bank,
    /// Share issuer.
    Company,
}

impl AccountRole {
    /// Returns true if the role may issue shares.
    #[inline]
    #[must_use]
    pub const fn can_issue_shares(&self) -> bool {
        matches!(self, Self::Company)
    }

    /// Stable storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Bank => "bank",
            Self::Company => "company",
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            "bank" => Ok(Self::Bank),
            "company" => Ok(Self::Company),
            other => Err(format!("unknown account role: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn only_company_issues() {
        assert!(AccountRole::Company.can_issue_shares());
        assert!(!AccountRole::User.can_issue_shares());
        assert!(!AccountRole::Admin.can_issue_shares());
        assert!(!AccountRole::Bank.can_issue_shares());
    }

    #[test]
    fn parses_storage_form() {
        for role in [
            AccountRole::Admin,
            AccountRole::User,
            AccountRole::Bank,
            AccountRole::Company,
        ] {
            assert_eq!(role.as_str().parse::<AccountRole>().unwrap(), role);
        }
        assert!("root".parse::<AccountRole>().is_err());
    }
}
