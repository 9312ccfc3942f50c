//! The persistence interface the monitor's cache sits in front of.

use chrono::{DateTime, Utc};

use crate::error::StateResult;
use crate::types::{FailureLogEntry, HostStatus, RequestLogEntry};

/// Durable storage for host status rows and their audit logs.
///
/// Implementations must be safe for unbounded concurrent use; callers
/// serialize writes per host but not across hosts.
pub trait StatusBackend: Send + Sync {
    /// Load the persisted row for `host`, if any.
    fn load_host_status(&self, host: &str) -> StateResult<Option<HostStatus>>;

    /// Insert or replace the row for `status.host`.
    fn put_host_status(&self, status: &HostStatus) -> StateResult<()>;

    /// Insert or replace the request-log row for the entry's host and label.
    fn log_request(&self, entry: &RequestLogEntry) -> StateResult<()>;

    /// Append a failure-log row.
    fn log_failure(&self, entry: &FailureLogEntry) -> StateResult<()>;

    /// Write the status row and the request-log row as one unit.
    fn put_status_and_log_request(
        &self,
        status: &HostStatus,
        entry: &RequestLogEntry,
    ) -> StateResult<()>;

    /// Write the status row and the failure-log row as one unit.
    fn put_status_and_log_failure(
        &self,
        status: &HostStatus,
        entry: &FailureLogEntry,
    ) -> StateResult<()>;

    /// Delete request-log rows sampled before `before`, and host status rows
    /// not updated since then. Returns `(requests, statuses)` removed.
    fn purge_request_log(&self, before: DateTime<Utc>) -> StateResult<(u64, u64)>;

    /// Delete one host's request-log rows sampled before `before`.
    fn purge_request_log_for_host(&self, host: &str, before: DateTime<Utc>) -> StateResult<u64>;

    /// Delete failure-log rows recorded before `before`.
    fn purge_failure_log(&self, before: DateTime<Utc>) -> StateResult<u64>;
}
