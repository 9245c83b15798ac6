//! # Timestamp Value Object
//!
//! UTC instant with millisecond storage precision.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in time, always UTC.
///
/// Persisted as milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Builds a timestamp from epoch milliseconds.
    ///
    /// Returns `None` if the value is out of chrono's range.
    #[must_use]
    pub fn from_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }

    /// Milliseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub fn timestamp_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Returns the inner `DateTime`.
    #[inline]
    #[must_use]
    pub const fn get(&self) -> DateTime<Utc> {
        self.0
    }

    /// Returns this instant shifted forward by `days`.
    #[must_use]
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Returns this instant shifted backward by `duration`.
    #[must_use]
    pub fn sub_duration(&self, duration: Duration) -> Self {
        Self(self.0 - duration)
    }

    /// True if `self` lies strictly before `other`.
    #[inline]
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn millis_round_trip_truncates_to_millis() {
        let now = Timestamp::now();
        let back = Timestamp::from_millis(now.timestamp_millis()).unwrap();
        assert_eq!(back.timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn add_days_moves_forward() {
        let t = Timestamp::from_millis(0).unwrap();
        assert_eq!(t.add_days(10).timestamp_millis(), 10 * 24 * 60 * 60 * 1000);
        assert!(t.is_before(&t.add_days(1)));
    }

    #[test]
    fn sub_duration_moves_backward() {
        let t = Timestamp::from_millis(60_000).unwrap();
        assert_eq!(t.sub_duration(Duration::seconds(60)).timestamp_millis(), 0);
    }
}
