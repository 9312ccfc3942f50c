//! Per-iteration host tracking.
//!
//! A sampling loop calls [`IterationTracker::begin_iteration`] at the top
//! of every pass. Request-log rows for the hosts seen in the previous pass
//! that predate that pass are dropped, so the log holds at most one pass
//! of history per host.

use std::collections::HashSet;
use std::mem;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::MonitorResult;
use crate::store::MonitorStore;

#[derive(Debug, Default)]
pub struct IterationTracker {
    visited: Vec<String>,
    seen: HashSet<String>,
    previous: Vec<String>,
    previous_start: Option<DateTime<Utc>>,
}

impl IterationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `host` as visited. Returns false if it already was.
    pub fn visit(&mut self, host: &str) -> bool {
        if !self.seen.insert(host.to_string()) {
            return false;
        }
        self.visited.push(host.to_string());
        true
    }

    /// Hosts visited in the current iteration, in first-visit order.
    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    /// Hosts visited in the previous iteration.
    pub fn previous(&self) -> &[String] {
        &self.previous
    }

    /// Start time of the previous iteration, if one has begun.
    pub fn previous_start(&self) -> Option<DateTime<Utc>> {
        self.previous_start
    }

    pub fn begin_iteration<S: MonitorStore + ?Sized>(&mut self, store: &S) -> MonitorResult<()> {
        self.begin_iteration_at(store, Utc::now())
    }

    pub fn begin_iteration_at<S: MonitorStore + ?Sized>(
        &mut self,
        store: &S,
        now: DateTime<Utc>,
    ) -> MonitorResult<()> {
        if let Some(start) = self.previous_start {
            for host in &self.previous {
                store.purge_request_log_for_host(host, start)?;
            }
            debug!(hosts = self.previous.len(), %start, "purged previous iteration request log");
        }

        self.previous = mem::take(&mut self.visited);
        self.seen.clear();
        self.previous_start = Some(now);
        Ok(())
    }
}
