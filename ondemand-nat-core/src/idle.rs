//! Idle eviction policy and LastRequested timestamp handling

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeDelta, Utc};

use crate::resource::GatewayRecord;

/// What the idle sweep does with a gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleAction {
    Delete,
    Keep,
}

/// Outcome of evaluating one gateway against the policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdleVerdict {
    /// Time since the gateway was created
    pub age: TimeDelta,
    /// Time since demand was last confirmed (falls back to `age`)
    pub inactive: TimeDelta,
    pub action: IdleAction,
}

/// Deletes gateways whose inactivity reached the threshold
#[derive(Debug, Clone, Copy)]
pub struct IdlePolicy {
    threshold: TimeDelta,
}

impl IdlePolicy {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold: TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn evaluate(&self, gateway: &GatewayRecord, now: DateTime<Utc>) -> IdleVerdict {
        let age = now - gateway.created_at;
        let inactive = match gateway.last_requested {
            Some(at) => now - at,
            None => age,
        };
        let action = if inactive >= self.threshold {
            IdleAction::Delete
        } else {
            IdleAction::Keep
        };
        IdleVerdict {
            age,
            inactive,
            action,
        }
    }
}

/// Render a timestamp the way it is stored in the LastRequested tag
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a LastRequested tag value
///
/// Accepts RFC 3339 and the naive `YYYY-MM-DD HH:MM:SS[.ffffff]` form, which
/// is read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Render a duration as `H:MM:SS`
pub fn format_duration(d: TimeDelta) -> String {
    let sign = if d < TimeDelta::zero() { "-" } else { "" };
    let secs = d.num_seconds().abs();
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}
