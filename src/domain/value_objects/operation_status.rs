//! # Operation Status
//!
//! Trade lifecycle state machine.
//!
//! # State Machine
//!
//! ```text
//! PendingPayment ──→ Succeed
//!        │
//!        └─────────→ Rejected
//! ```
//!
//! Both outcomes are terminal. A pending operation is finalized exactly once
//! by the settlement callback.
//!
//! # Examples
//!
//! ```
//! use share_ledger::domain::value_objects::operation_status::OperationStatus;
//!
//! let status = OperationStatus::PendingPayment;
//! assert!(status.can_transition_to(OperationStatus::Succeed));
//! assert!(!OperationStatus::Rejected.can_transition_to(OperationStatus::Succeed));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of an operation (trade).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OperationStatus {
    /// Inventory reserved, waiting for the payment processor's verdict.
    #[default]
    PendingPayment,

    /// Payment settled and shares transferred (terminal).
    Succeed,

    /// Payment failed and the reservation was released (terminal).
    Rejected,
}

impl OperationStatus {
    /// Returns true if no further transition is possible.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeed | Self::Rejected)
    }

    /// Returns true if the operation still awaits its settlement verdict.
    #[inline]
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::PendingPayment)
    }

    /// Returns true if this status can transition to `target`.
    ///
    /// Only `PendingPayment → Succeed` and `PendingPayment → Rejected` are legal.
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::PendingPayment, Self::Succeed) | (Self::PendingPayment, Self::Rejected)
        )
    }

    /// Stable storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PendingPayment => "PendingPayment",
            Self::Succeed => "Succeed",
            Self::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OperationStatus {
    type Err = InvalidOperationStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PendingPayment" => Ok(Self::PendingPayment),
            "Succeed" => Ok(Self::Succeed),
            "Rejected" => Ok(Self::Rejected),
            other => Err(InvalidOperationStatusError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidOperationStatusError(pub String);

impl fmt::Display for InvalidOperationStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid operation status: {}", self.0)
    }
}

impl std::error::Error for InvalidOperationStatusError {}
