//! Time handling for query ranges and sample timestamps

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BridgeError, BridgeResult};

/// Point in time, carried on the wire as milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(#[serde(with = "chrono::serde::ts_milliseconds")] DateTime<Utc>);

/// Time range for queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start time (inclusive)
    pub start: Timestamp,
    /// End time (inclusive)
    pub end: Timestamp,
}

impl Timestamp {
    /// Get the current timestamp
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create from milliseconds since Unix epoch
    pub fn from_millis(millis: i64) -> BridgeResult<Self> {
        match Utc.timestamp_millis_opt(millis) {
            chrono::LocalResult::Single(dt) => Ok(Self(dt)),
            _ => Err(BridgeError::TimeRange(format!(
                "Invalid timestamp: {}",
                millis
            ))),
        }
    }

    /// Get milliseconds since Unix epoch
    pub fn timestamp_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Format as ISO 8601 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl TimeRange {
    /// Create a new time range; a zero-length range is allowed
    pub fn new(start: Timestamp, end: Timestamp) -> BridgeResult<Self> {
        if start > end {
            return Err(BridgeError::TimeRange(
                "Start time must not be after end time".to_string(),
            ));
        }

        Ok(Self { start, end })
    }

    /// Create a time range from milliseconds
    pub fn from_millis(start_ms: i64, end_ms: i64) -> BridgeResult<Self> {
        let start = Timestamp::from_millis(start_ms)?;
        let end = Timestamp::from_millis(end_ms)?;
        Self::new(start, end)
    }

    /// Get the duration of this time range in milliseconds
    pub fn duration_millis(&self) -> i64 {
        self.end.timestamp_millis() - self.start.timestamp_millis()
    }

    /// Check that the range is ordered, for ranges built by deserialization
    pub fn validate(&self) -> BridgeResult<()> {
        Self::new(self.start, self.end).map(|_| ())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} - {}]", self.start, self.end)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
