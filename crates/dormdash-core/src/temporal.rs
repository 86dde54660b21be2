//! # Temporal Types: UTC-Only Timestamps
//!
//! Defines `Timestamp`, the creation time stamped on every record, and
//! [`parse_schedule`], the parser for the wall-clock time at which a
//! service takes place.
//!
//! ## Invariants
//!
//! - Timestamps are UTC. Non-UTC inputs to [`Timestamp::parse()`] are
//!   rejected rather than silently converted.
//! - Precision is milliseconds. Two records created in the same second
//!   still order correctly, which message threads depend on.
//! - Serialized form is RFC 3339 with a `Z` suffix, e.g.
//!   `2026-03-01T10:00:00.250Z`.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC timestamp, truncated to millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current UTC time, truncated to milliseconds.
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(3))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating to milliseconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(3))
    }

    /// Parse an RFC 3339 timestamp.
    ///
    /// Only the `Z` suffix is accepted; explicit offsets, even `+00:00`,
    /// are rejected.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::InvalidDateTime {
                value: s.to_string(),
                reason: "timestamp must use the Z suffix (UTC only)".to_string(),
            });
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| ValidationError::InvalidDateTime {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_utc(dt.with_timezone(&Utc)))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Milliseconds since the Unix epoch.
    pub fn epoch_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Render as RFC 3339 with millisecond precision and a `Z` suffix.
    pub fn to_rfc3339(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

/// Parse the local wall-clock time a service is scheduled for.
///
/// Accepts `YYYY-MM-DDTHH:MM` (what a `datetime-local` form field
/// produces) and `YYYY-MM-DDTHH:MM:SS`. A space is accepted in place of
/// the `T`. No timezone: the schedule is local to the campus.
pub fn parse_schedule(s: &str) -> Result<NaiveDateTime, ValidationError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field: "date_time" });
    }
    let normalized = trimmed.replacen(' ', "T", 1);
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M"))
        .map_err(|e| ValidationError::InvalidDateTime {
            value: s.to_string(),
            reason: e.to_string(),
        })
}
