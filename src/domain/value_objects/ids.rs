//! # Identifier Types
//!
//! Type-safe identifiers for ledger entities.
//!
//! Every aggregate is keyed by a UUID wrapped in its own newtype, so an
//! [`AskId`] can never be passed where a [`BidId`] is expected.
//!
//! # Examples
//!
//! ```
//! use share_ledger::domain::value_objects::ids::{AskId, OperationId};
//!
//! let ask_id = AskId::new_v4();
//! let operation_id = OperationId::new_v4();
//!
//! assert_eq!(ask_id.to_string().len(), 36);
//! assert_ne!(ask_id.get(), operation_id.get());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates the identifier from an existing UUID.
            #[inline]
            #[must_use]
            pub const fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generates a new random identifier using UUID v4.
            #[must_use]
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the inner UUID value.
            #[inline]
            #[must_use]
            pub const fn get(self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl From<Uuid> for $name {
            #[inline]
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_identifier! {
    /// Account identifier.
    ///
    /// Accounts are provisioned by the identity service; the ledger only
    /// stores the id it is given.
    AccountId
}

uuid_identifier! {
    /// Share (issued security) identifier.
    ShareId
}

uuid_identifier! {
    /// Ask (sale listing) identifier.
    AskId
}

uuid_identifier! {
    /// Bid (buy proposal) identifier.
    BidId
}

uuid_identifier! {
    /// Operation (trade record) identifier.
    ///
    /// Also used as the message key for outbound payment requests and as the
    /// correlation id on inbound settlement results.
    OperationId
}
