//! Fault isolation for host-status storage.
//!
//! [`ErrorHandlingStore`] wraps another [`MonitorStore`] and turns every
//! storage error into a logged warning. A failed read falls back to the
//! last status this wrapper saw for the host, or a fresh one. A failed
//! write remembers the status it was given so the next failed read sees
//! it. Decisions keep being made while the database is down, at the cost
//! of durability.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::warn;

use hostwatch_state::{FailureLogEntry, HostStatus, RequestLogEntry};

use crate::error::MonitorResult;
use crate::store::{HostLock, MonitorStore};

/// Wraps another store, logging and swallowing all errors.
pub struct ErrorHandlingStore<S> {
    inner: S,
    /// Statuses held only in memory because `inner` failed them.
    fallback: DashMap<String, HostStatus>,
}

impl<S: MonitorStore> ErrorHandlingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fallback: DashMap::new(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of hosts currently served from the fallback map.
    pub fn fallback_hosts(&self) -> usize {
        self.fallback.len()
    }

    fn remember(&self, status: &HostStatus) {
        self.fallback.insert(status.host.clone(), status.clone());
    }
}

impl<S: MonitorStore> MonitorStore for ErrorHandlingStore<S> {
    fn host_lock(&self, host: &str) -> HostLock {
        self.inner.host_lock(host)
    }

    fn get_host_status(&self, host: &str) -> MonitorResult<HostStatus> {
        match self.inner.get_host_status(host) {
            Ok(status) => {
                self.fallback.remove(host);
                Ok(status)
            }
            Err(e) => {
                warn!(
                    %host,
                    error = %e,
                    "failed to retrieve/create host status, using memory storage only"
                );
                let status = self
                    .fallback
                    .entry(host.to_string())
                    .or_insert_with(|| HostStatus::new(host))
                    .value()
                    .clone();
                Ok(status)
            }
        }
    }

    fn store_host_status(&self, status: &mut HostStatus) -> MonitorResult<()> {
        if let Err(e) = self.inner.store_host_status(status) {
            warn!(host = %status.host, error = %e, "failed to persist host status, using memory storage only");
            self.remember(status);
        }
        Ok(())
    }

    fn log_request(&self, entry: &RequestLogEntry) -> MonitorResult<()> {
        if let Err(e) = self.inner.log_request(entry) {
            warn!(host = %entry.host, error = %e, "failed to log request to database");
        }
        Ok(())
    }

    fn log_failure(&self, entry: &FailureLogEntry) -> MonitorResult<()> {
        if let Err(e) = self.inner.log_failure(entry) {
            warn!(host = %entry.host, error = %e, "failed to log failure to database");
        }
        Ok(())
    }

    fn log_request_and_status(
        &self,
        status: &mut HostStatus,
        entry: &RequestLogEntry,
    ) -> MonitorResult<()> {
        if let Err(e) = self.inner.log_request_and_status(status, entry) {
            warn!(host = %status.host, error = %e, "failed to log request and store status to database");
            self.remember(status);
        }
        Ok(())
    }

    fn log_failure_and_status(
        &self,
        status: &mut HostStatus,
        entry: &FailureLogEntry,
    ) -> MonitorResult<()> {
        if let Err(e) = self.inner.log_failure_and_status(status, entry) {
            warn!(host = %status.host, error = %e, "failed to log failure and store status to database");
            self.remember(status);
        }
        Ok(())
    }

    fn purge_status_cache(&self, before: DateTime<Utc>) -> MonitorResult<usize> {
        let held = self.fallback.len();
        self.fallback.retain(|_, status| status.last_updated >= before);
        let dropped = held.saturating_sub(self.fallback.len());

        match self.inner.purge_status_cache(before) {
            Ok(removed) => Ok(removed + dropped),
            Err(e) => {
                warn!(error = %e, "failed to purge status cache");
                Ok(dropped)
            }
        }
    }

    fn purge_request_log(&self, before: DateTime<Utc>) -> MonitorResult<()> {
        if let Err(e) = self.inner.purge_request_log(before) {
            warn!(error = %e, "failed to purge request log database");
        }
        Ok(())
    }

    fn purge_request_log_for_host(&self, host: &str, before: DateTime<Utc>) -> MonitorResult<()> {
        if let Err(e) = self.inner.purge_request_log_for_host(host, before) {
            warn!(%host, error = %e, "failed to purge request log database");
        }
        Ok(())
    }

    fn purge_failure_log(&self, before: DateTime<Utc>) -> MonitorResult<()> {
        if let Err(e) = self.inner.purge_failure_log(before) {
            warn!(error = %e, "failed to purge failure log database");
        }
        Ok(())
    }
}
