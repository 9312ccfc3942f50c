//! Host status store with per-host locking and a write-through cache in front
//! of a [`StatusBackend`].
//!
//! # Locking
//!
//! Every host has exactly one re-entrant lock, created on first use with
//! the map's atomic entry API. The engine holds it for a whole
//! read-modify-write; store operations re-acquire it on the same thread.
//! No `DashMap` guard is held across a backend call.
//!
//! # Cache
//!
//! The cache only accelerates reads. Evicted entries are reloaded from
//! the backend, or recreated as zero state, on next access. When the
//! backend cannot be reached the cached copy is the only state and the
//! store keeps working from it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use tracing::{debug, info, warn};

use hostwatch_state::{FailureLogEntry, HostStatus, RequestLogEntry, StateResult, StatusBackend};

use crate::error::MonitorResult;

/// The canonical exclusive-access handle for one host.
pub type HostLock = Arc<ReentrantMutex<()>>;

/// Operations the monitor engine needs from host-status storage.
///
/// Implemented by [`CachingStore`] and by the fault-isolating
/// [`ErrorHandlingStore`](crate::resilient::ErrorHandlingStore), so the
/// engine never knows which one it holds.
pub trait MonitorStore: Send + Sync {
    /// The single lock shared by every caller touching `host`.
    fn host_lock(&self, host: &str) -> HostLock;

    /// Current status for `host`, loading or creating it as needed.
    fn get_host_status(&self, host: &str) -> MonitorResult<HostStatus>;

    /// Stamp `last_updated` and write the full row.
    fn store_host_status(&self, status: &mut HostStatus) -> MonitorResult<()>;

    fn log_request(&self, entry: &RequestLogEntry) -> MonitorResult<()>;

    fn log_failure(&self, entry: &FailureLogEntry) -> MonitorResult<()>;

    /// Store the status and upsert its request-log row as one unit.
    fn log_request_and_status(
        &self,
        status: &mut HostStatus,
        entry: &RequestLogEntry,
    ) -> MonitorResult<()>;

    /// Store the status and append its failure-log row as one unit.
    fn log_failure_and_status(
        &self,
        status: &mut HostStatus,
        entry: &FailureLogEntry,
    ) -> MonitorResult<()>;

    /// Evict cached statuses last updated before `before`. Returns the
    /// number evicted.
    fn purge_status_cache(&self, before: DateTime<Utc>) -> MonitorResult<usize>;

    fn purge_request_log(&self, before: DateTime<Utc>) -> MonitorResult<()>;

    fn purge_request_log_for_host(&self, host: &str, before: DateTime<Utc>) -> MonitorResult<()>;

    fn purge_failure_log(&self, before: DateTime<Utc>) -> MonitorResult<()>;
}

/// Cache and lock map in front of a persistent backend.
pub struct CachingStore {
    backend: Arc<dyn StatusBackend>,
    locks: DashMap<String, HostLock>,
    cache: DashMap<String, HostStatus>,
}

impl CachingStore {
    pub fn new(backend: Arc<dyn StatusBackend>) -> Self {
        Self {
            backend,
            locks: DashMap::new(),
            cache: DashMap::new(),
        }
    }

    /// Cached status for `host` without touching the backend.
    pub fn cached(&self, host: &str) -> Option<HostStatus> {
        self.cache.get(host).map(|entry| entry.value().clone())
    }

    /// Number of cached host statuses.
    pub fn cached_hosts(&self) -> usize {
        self.cache.len()
    }

    /// Number of live host locks.
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Drop every cached status.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn load_or_create(&self, host: &str) -> StateResult<HostStatus> {
        if let Some(status) = self.backend.load_host_status(host)? {
            debug!(%host, status = %status.status, "host status loaded");
            return Ok(status);
        }
        let status = HostStatus::new(host);
        self.backend.put_host_status(&status)?;
        debug!(%host, "host status created");
        Ok(status)
    }

    /// Stamp and cache `status`, then hand it to `write`. The cache is
    /// updated first so a failing backend never loses in-memory progress.
    fn write_through<F>(&self, status: &mut HostStatus, write: F) -> MonitorResult<()>
    where
        F: FnOnce(&dyn StatusBackend, &HostStatus) -> StateResult<()>,
    {
        let lock = self.host_lock(&status.host);
        let _guard = lock.lock();

        status.touch(Utc::now());
        self.cache.insert(status.host.clone(), status.clone());
        write(self.backend.as_ref(), status)?;
        Ok(())
    }
}

impl MonitorStore for CachingStore {
    fn host_lock(&self, host: &str) -> HostLock {
        if let Some(lock) = self.locks.get(host) {
            return lock.value().clone();
        }
        // Another thread may have raced us here; the entry API keeps
        // whichever lock landed first.
        self.locks
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(ReentrantMutex::new(())))
            .value()
            .clone()
    }

    fn get_host_status(&self, host: &str) -> MonitorResult<HostStatus> {
        let lock = self.host_lock(host);
        let _guard = lock.lock();

        if let Some(cached) = self.cached(host) {
            return Ok(cached);
        }

        let status = match self.load_or_create(host) {
            Ok(status) => status,
            Err(e) => {
                warn!(
                    %host,
                    error = %e,
                    "failed to retrieve/create host status in database, using memory storage only"
                );
                HostStatus::new(host)
            }
        };

        self.cache.insert(host.to_string(), status.clone());
        Ok(status)
    }

    fn store_host_status(&self, status: &mut HostStatus) -> MonitorResult<()> {
        self.write_through(status, |backend, status| backend.put_host_status(status))
    }

    fn log_request(&self, entry: &RequestLogEntry) -> MonitorResult<()> {
        self.backend.log_request(entry)?;
        Ok(())
    }

    fn log_failure(&self, entry: &FailureLogEntry) -> MonitorResult<()> {
        self.backend.log_failure(entry)?;
        Ok(())
    }

    fn log_request_and_status(
        &self,
        status: &mut HostStatus,
        entry: &RequestLogEntry,
    ) -> MonitorResult<()> {
        self.write_through(status, |backend, status| {
            backend.put_status_and_log_request(status, entry)
        })
    }

    fn log_failure_and_status(
        &self,
        status: &mut HostStatus,
        entry: &FailureLogEntry,
    ) -> MonitorResult<()> {
        self.write_through(status, |backend, status| {
            backend.put_status_and_log_failure(status, entry)
        })
    }

    fn purge_status_cache(&self, before: DateTime<Utc>) -> MonitorResult<usize> {
        let stale: Vec<String> = self
            .cache
            .iter()
            .filter(|entry| entry.value().last_updated < before)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for host in stale {
            let lock = self.host_lock(&host);
            // A held lock means the host is mid-update; leave it for next time.
            let Some(_guard) = lock.try_lock() else {
                continue;
            };
            if self
                .cache
                .remove_if(&host, |_, status| status.last_updated < before)
                .is_some()
            {
                removed += 1;
            }
        }

        // Drop locks nobody holds for hosts that are no longer cached.
        self.locks
            .retain(|host, lock| Arc::strong_count(lock) > 1 || self.cache.contains_key(host));

        if removed > 0 {
            info!(removed, %before, "purged host statuses from memory");
        }
        Ok(removed)
    }

    fn purge_request_log(&self, before: DateTime<Utc>) -> MonitorResult<()> {
        self.backend.purge_request_log(before)?;
        Ok(())
    }

    fn purge_request_log_for_host(&self, host: &str, before: DateTime<Utc>) -> MonitorResult<()> {
        self.backend.purge_request_log_for_host(host, before)?;
        Ok(())
    }

    fn purge_failure_log(&self, before: DateTime<Utc>) -> MonitorResult<()> {
        self.backend.purge_failure_log(before)?;
        Ok(())
    }
}
