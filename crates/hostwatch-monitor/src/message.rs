//! Notification subject and body rendering.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use hostwatch_state::Status;

/// A rendered notification ready for a [`Notifier`](crate::notify::Notifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

/// Everything a subject or body line mentions.
#[derive(Debug, Clone, Copy)]
pub struct MessageContext<'a> {
    pub prefix: &'a str,
    pub host: &'a str,
    pub label: &'a str,
    pub time: DateTime<Utc>,
    pub status: Status,
    pub message_count: u32,
    pub failure_count: u32,
    pub errors: Option<&'a str>,
}

impl MessageContext<'_> {
    /// `"{prefix}: {host} {STATUS}"`, with the counters appended for `DOWN`.
    pub fn subject(&self) -> String {
        let mut subject = format!("{}: {} {}", self.prefix, self.host, self.status);
        if self.status == Status::Down {
            let _ = write!(
                subject,
                " (fc={}, mc={})",
                self.failure_count, self.message_count
            );
        }
        subject
    }

    pub fn body(&self) -> String {
        let mut body = format!(
            "{}: {}: {} ({} )",
            self.time, self.prefix, self.host, self.label
        );
        if self.status.is_up() {
            let _ = write!(body, " {}", self.status);
        } else {
            let _ = write!(
                body,
                " (failureCount={}, messageCount={})\n{}",
                self.failure_count,
                self.message_count,
                self.errors.unwrap_or_default()
            );
        }
        body
    }
}
