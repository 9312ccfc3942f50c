//! StatusDb: redb-backed persistence for host status and audit logs.
//!
//! All values are JSON-serialized into redb's `&[u8]` value columns.
//! Compound writes (status row plus a log row) share one write
//! transaction so the two never diverge. The store supports both on-disk
//! and in-memory backends (the latter for testing and degraded startup).

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, WriteTransaction};
use tracing::{debug, info};

use crate::backend::StatusBackend;
use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe status store backed by redb.
#[derive(Clone)]
pub struct StatusDb {
    db: Arc<Database>,
}

impl StatusDb {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "status db opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store.
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory status db opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(HOST_STATUS).map_err(map_err!(Table))?;
        txn.open_table(REQUEST_LOG).map_err(map_err!(Table))?;
        txn.open_table(FAILURE_LOG).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// List every persisted host status.
    pub fn list_host_statuses(&self) -> StateResult<Vec<HostStatus>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(HOST_STATUS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let status: HostStatus =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(status);
        }
        Ok(results)
    }

    /// List request-log rows for one host.
    pub fn list_requests_for_host(&self, host: &str) -> StateResult<Vec<RequestLogEntry>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(REQUEST_LOG).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let row: RequestLogEntry =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if row.host == host {
                results.push(row);
            }
        }
        Ok(results)
    }

    /// List failure-log rows for one host in insertion order.
    pub fn list_failures_for_host(&self, host: &str) -> StateResult<Vec<FailureLogEntry>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(FAILURE_LOG).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let row: FailureLogEntry =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if row.host == host {
                results.push(row);
            }
        }
        Ok(results)
    }

    /// Run `write` inside a write transaction and commit it.
    fn write_with<F>(&self, write: F) -> StateResult<()>
    where
        F: FnOnce(&WriteTransaction) -> StateResult<()>,
    {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        write(&txn)?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }
}

// ── Row writers shared by single and compound operations ───────────

fn write_host_status(txn: &WriteTransaction, status: &HostStatus) -> StateResult<()> {
    let value = serde_json::to_vec(status).map_err(map_err!(Serialize))?;
    let mut table = txn.open_table(HOST_STATUS).map_err(map_err!(Table))?;
    table
        .insert(status.host.as_str(), value.as_slice())
        .map_err(map_err!(Write))?;
    Ok(())
}

fn write_request(txn: &WriteTransaction, entry: &RequestLogEntry) -> StateResult<()> {
    if !entry.has_valid_key() {
        return Err(StateError::Write(format!(
            "request log key for host '{}' contains the key separator",
            entry.host.escape_debug()
        )));
    }
    let key = entry.table_key();
    let value = serde_json::to_vec(entry).map_err(map_err!(Serialize))?;
    let mut table = txn.open_table(REQUEST_LOG).map_err(map_err!(Table))?;
    table
        .insert(key.as_str(), value.as_slice())
        .map_err(map_err!(Write))?;
    Ok(())
}

fn append_failure(txn: &WriteTransaction, entry: &FailureLogEntry) -> StateResult<()> {
    let value = serde_json::to_vec(entry).map_err(map_err!(Serialize))?;
    let mut table = txn.open_table(FAILURE_LOG).map_err(map_err!(Table))?;
    let next = match table.last().map_err(map_err!(Read))? {
        Some((key, _)) => key.value() + 1,
        None => 0,
    };
    table
        .insert(next, value.as_slice())
        .map_err(map_err!(Write))?;
    Ok(())
}

impl StatusBackend for StatusDb {
    fn load_host_status(&self, host: &str) -> StateResult<Option<HostStatus>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(HOST_STATUS).map_err(map_err!(Table))?;
        match table.get(host).map_err(map_err!(Read))? {
            Some(guard) => {
                let status: HostStatus =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(status))
            }
            None => Ok(None),
        }
    }

    fn put_host_status(&self, status: &HostStatus) -> StateResult<()> {
        self.write_with(|txn| write_host_status(txn, status))?;
        debug!(host = %status.host, status = %status.status, "host status stored");
        Ok(())
    }

    fn log_request(&self, entry: &RequestLogEntry) -> StateResult<()> {
        self.write_with(|txn| write_request(txn, entry))
    }

    fn log_failure(&self, entry: &FailureLogEntry) -> StateResult<()> {
        self.write_with(|txn| append_failure(txn, entry))
    }

    fn put_status_and_log_request(
        &self,
        status: &HostStatus,
        entry: &RequestLogEntry,
    ) -> StateResult<()> {
        self.write_with(|txn| {
            write_host_status(txn, status)?;
            write_request(txn, entry)
        })
    }

    fn put_status_and_log_failure(
        &self,
        status: &HostStatus,
        entry: &FailureLogEntry,
    ) -> StateResult<()> {
        self.write_with(|txn| {
            write_host_status(txn, status)?;
            append_failure(txn, entry)
        })?;
        debug!(host = %status.host, outcome = %entry.outcome, "failure logged");
        Ok(())
    }

    fn purge_request_log(&self, before: DateTime<Utc>) -> StateResult<(u64, u64)> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let requests;
        let statuses;
        {
            let mut table = txn.open_table(REQUEST_LOG).map_err(map_err!(Table))?;
            let mut stale = Vec::new();
            for entry in table.iter().map_err(map_err!(Read))? {
                let (key, value) = entry.map_err(map_err!(Read))?;
                let row: RequestLogEntry =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                if row.last_sample < before {
                    stale.push(key.value().to_string());
                }
            }
            for key in &stale {
                table.remove(key.as_str()).map_err(map_err!(Write))?;
            }
            requests = stale.len() as u64;
        }
        {
            let mut table = txn.open_table(HOST_STATUS).map_err(map_err!(Table))?;
            let mut stale = Vec::new();
            for entry in table.iter().map_err(map_err!(Read))? {
                let (key, value) = entry.map_err(map_err!(Read))?;
                let row: HostStatus =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                if row.last_updated < before {
                    stale.push(key.value().to_string());
                }
            }
            for key in &stale {
                table.remove(key.as_str()).map_err(map_err!(Write))?;
            }
            statuses = stale.len() as u64;
        }
        txn.commit().map_err(map_err!(Transaction))?;

        if requests > 0 {
            info!(requests, %before, "purged old requests from database");
        }
        if statuses > 0 {
            info!(statuses, %before, "purged old statuses from database");
        }
        Ok((requests, statuses))
    }

    fn purge_request_log_for_host(&self, host: &str, before: DateTime<Utc>) -> StateResult<u64> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let purged;
        {
            let mut table = txn.open_table(REQUEST_LOG).map_err(map_err!(Table))?;
            // Every key for `host` sorts between these two bounds.
            let start = format!("{host}{KEY_SEPARATOR}");
            let end = format!("{host}{KEY_SEPARATOR_NEXT}");
            let mut stale = Vec::new();
            for entry in table
                .range(start.as_str()..end.as_str())
                .map_err(map_err!(Read))?
            {
                let (key, value) = entry.map_err(map_err!(Read))?;
                let row: RequestLogEntry =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                if row.last_sample < before {
                    stale.push(key.value().to_string());
                }
            }
            for key in &stale {
                table.remove(key.as_str()).map_err(map_err!(Write))?;
            }
            purged = stale.len() as u64;
        }
        txn.commit().map_err(map_err!(Transaction))?;

        if purged > 0 {
            info!(%host, requests = purged, %before, "purged old requests for host from database");
        }
        Ok(purged)
    }

    fn purge_failure_log(&self, before: DateTime<Utc>) -> StateResult<u64> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let purged;
        {
            let mut table = txn.open_table(FAILURE_LOG).map_err(map_err!(Table))?;
            let mut stale = Vec::new();
            for entry in table.iter().map_err(map_err!(Read))? {
                let (key, value) = entry.map_err(map_err!(Read))?;
                let row: FailureLogEntry =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                if row.failure_time < before {
                    stale.push(key.value());
                }
            }
            for key in &stale {
                table.remove(*key).map_err(map_err!(Write))?;
            }
            purged = stale.len() as u64;
        }
        txn.commit().map_err(map_err!(Transaction))?;

        if purged > 0 {
            info!(failures = purged, %before, "purged old failures from database");
        }
        Ok(purged)
    }
}
