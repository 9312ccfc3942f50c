//! Domain types for hostwatch.
//!
//! These types represent the tracked condition of each monitored host and
//! the audit rows written alongside it. All types are serializable to/from
//! JSON for storage in redb tables.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tables::KEY_SEPARATOR;

// ── Status ────────────────────────────────────────────────────────

/// Condition of a host, including whether it is out of rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Up,
    OutUp,
    OutDown,
    Down,
    Unknown,
}

impl Status {
    /// Whether the host is answering requests.
    pub fn is_up(self) -> bool {
        matches!(self, Status::Up | Status::OutUp)
    }

    /// Whether the host has been administratively removed from rotation.
    pub fn is_out(self) -> bool {
        matches!(self, Status::OutUp | Status::OutDown)
    }

    /// Upper-case name used in storage and messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Up => "UP",
            Status::OutUp => "OUT_UP",
            Status::OutDown => "OUT_DOWN",
            Status::Down => "DOWN",
            Status::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognised status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "UP" => Ok(Status::Up),
            "OUT_UP" => Ok(Status::OutUp),
            "OUT_DOWN" => Ok(Status::OutDown),
            "DOWN" => Ok(Status::Down),
            "UNKNOWN" => Ok(Status::Unknown),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

// ── Host status ───────────────────────────────────────────────────

/// Tracked state of a single host.
///
/// Equality and hashing consider only the host name, so two snapshots of
/// the same host compare equal regardless of their counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostStatus {
    pub host: String,
    pub status: Status,
    /// Notifications sent during the current failure streak.
    pub message_count: u32,
    /// Consecutive failed observations since the last success.
    pub failure_count: u32,
    pub last_message_sent: Option<DateTime<Utc>>,
    /// Time of the last persisted write.
    pub last_updated: DateTime<Utc>,
}

impl HostStatus {
    /// Fresh state for a host that has never been observed.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            status: Status::Unknown,
            message_count: 0,
            failure_count: 0,
            last_message_sent: None,
            last_updated: Utc::now(),
        }
    }

    /// Advance `last_updated` to `now` without ever moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_updated {
            self.last_updated = now;
        }
    }
}

impl PartialEq for HostStatus {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host
    }
}

impl Eq for HostStatus {}

impl Hash for HostStatus {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
    }
}

// ── Notification outcome ──────────────────────────────────────────

/// What happened to the notification associated with a logged failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationOutcome {
    /// A message was handed to the notifier.
    Sent,
    /// No message was due.
    NotSent,
    /// A message was due but notifications are disabled for the host.
    SuppressedByConfig,
}

impl fmt::Display for NotificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationOutcome::Sent => "SENT",
            NotificationOutcome::NotSent => "NOT_SENT",
            NotificationOutcome::SuppressedByConfig => "SUPPRESSED_BY_CONFIG",
        };
        f.write_str(s)
    }
}

// ── Log rows ──────────────────────────────────────────────────────

/// Latest sample for a host/label pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestLogEntry {
    pub host: String,
    pub label: String,
    pub last_sample: DateTime<Utc>,
    /// Sample duration in milliseconds.
    pub duration_ms: u64,
    pub success: bool,
}

impl RequestLogEntry {
    /// Build the composite key for the request-log table.
    pub fn table_key(&self) -> String {
        format!("{}{KEY_SEPARATOR}{}", self.host, self.label)
    }

    /// Whether host and label can be combined into an unambiguous key.
    pub fn has_valid_key(&self) -> bool {
        !self.host.contains(KEY_SEPARATOR) && !self.label.contains(KEY_SEPARATOR)
    }
}

/// Audit record for a failed observation or a recovery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureLogEntry {
    pub host: String,
    pub label: String,
    pub failure_time: DateTime<Utc>,
    pub status: Status,
    pub subject: String,
    pub body: String,
    pub outcome: NotificationOutcome,
}
