//! Background retention task.
//!
//! Waits `purge_delay`, then every `purge_interval` drops failure-log and
//! request-log rows past their retention and evicts idle cached statuses.
//! Runs until the shutdown channel flips.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::RetentionConfig;
use crate::store::MonitorStore;

pub struct Purger<S: ?Sized> {
    store: Arc<S>,
    retention: RetentionConfig,
}

impl<S: MonitorStore + ?Sized> Purger<S> {
    pub fn new(store: Arc<S>, retention: RetentionConfig) -> Self {
        Self { store, retention }
    }

    /// One purge pass with cutoffs relative to `now`. Each step runs even
    /// if an earlier one failed.
    pub fn run_once(&self, now: DateTime<Utc>) {
        let failure_cutoff = now - minutes(self.retention.failure_log_minutes);
        if let Err(e) = self.store.purge_failure_log(failure_cutoff) {
            error!(error = %e, "failure log purge failed");
        }

        let request_cutoff = now - minutes(self.retention.request_log_minutes);
        if let Err(e) = self.store.purge_request_log(request_cutoff) {
            error!(error = %e, "request log purge failed");
        }

        let cache_cutoff = now - minutes(self.retention.status_cache_minutes);
        match self.store.purge_status_cache(cache_cutoff) {
            Ok(evicted) => debug!(evicted, "status cache purge complete"),
            Err(e) => error!(error = %e, "status cache purge failed"),
        }
    }

    /// Run the purge loop until shutdown signal.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            delay_secs = self.retention.purge_delay_secs,
            interval_secs = self.retention.purge_interval_secs,
            "purge task started"
        );

        tokio::select! {
            _ = tokio::time::sleep(self.retention.purge_delay()) => {}
            _ = shutdown.changed() => {
                info!("purge task shutting down");
                return;
            }
        }

        loop {
            self.run_once(Utc::now());

            tokio::select! {
                _ = tokio::time::sleep(self.retention.purge_interval()) => {}
                _ = shutdown.changed() => {
                    info!("purge task shutting down");
                    break;
                }
            }
        }
    }
}

/// Spawn the purge loop on the current runtime.
pub fn spawn_purge_task<S>(
    store: Arc<S>,
    retention: RetentionConfig,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    S: MonitorStore + ?Sized + 'static,
{
    let purger = Purger::new(store, retention);
    tokio::spawn(async move { purger.run(shutdown).await })
}

fn minutes(n: u32) -> Duration {
    Duration::minutes(i64::from(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    use hostwatch_state::{
        FailureLogEntry, NotificationOutcome, RequestLogEntry, Status, StatusBackend, StatusDb,
    };

    use crate::store::CachingStore;

    fn seeded() -> (Arc<CachingStore>, StatusDb) {
        let db = StatusDb::open_in_memory().unwrap();
        let store = Arc::new(CachingStore::new(Arc::new(db.clone())));
        let old = Utc::now() - Duration::days(10);

        db.log_request(&RequestLogEntry {
            host: "web-1".to_string(),
            label: "login".to_string(),
            last_sample: old,
            duration_ms: 40,
            success: true,
        })
        .unwrap();
        db.log_failure(&FailureLogEntry {
            host: "web-1".to_string(),
            label: "login".to_string(),
            failure_time: old,
            status: Status::Down,
            subject: "hostwatch: web-1 DOWN (fc=2, mc=1)".to_string(),
            body: String::new(),
            outcome: NotificationOutcome::Sent,
        })
        .unwrap();
        store.get_host_status("web-2").unwrap();
        (store, db)
    }

    #[test]
    fn run_once_applies_every_retention_window() {
        let (store, db) = seeded();
        let purger = Purger::new(store.clone(), RetentionConfig::default());

        purger.run_once(Utc::now() + Duration::minutes(10));

        assert!(db.list_requests_for_host("web-1").unwrap().is_empty());
        assert!(db.list_failures_for_host("web-1").unwrap().is_empty());
        assert_eq!(store.cached_hosts(), 0);
    }

    #[test]
    fn run_once_keeps_recent_rows() {
        let (store, db) = seeded();
        let purger = Purger::new(
            store.clone(),
            RetentionConfig {
                request_log_minutes: 60 * 24 * 30,
                failure_log_minutes: 60 * 24 * 30,
                ..RetentionConfig::default()
            },
        );

        purger.run_once(Utc::now());

        assert_eq!(db.list_requests_for_host("web-1").unwrap().len(), 1);
        assert_eq!(db.list_failures_for_host("web-1").unwrap().len(), 1);
        assert_eq!(store.cached_hosts(), 1);
        assert!(db.load_host_status("web-2").unwrap().is_some());
    }

    #[tokio::test]
    async fn task_runs_after_delay_and_stops_on_shutdown() {
        let (store, db) = seeded();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let retention = RetentionConfig {
            purge_delay_secs: 0,
            purge_interval_secs: 3600,
            ..RetentionConfig::default()
        };

        let handle = spawn_purge_task(store, retention, shutdown_rx);

        let mut purged = false;
        for _ in 0..100 {
            if db.list_failures_for_host("web-1").unwrap().is_empty() {
                purged = true;
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(20)).await;
        }
        assert!(purged);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(StdDuration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn shutdown_during_initial_delay() {
        let (store, db) = seeded();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = spawn_purge_task(store, RetentionConfig::default(), shutdown_rx);
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(StdDuration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(db.list_failures_for_host("web-1").unwrap().len(), 1);
    }
}
