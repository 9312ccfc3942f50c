//! Monitor engine: status transitions and notification decisions.
//!
//! One [`MonitorEngine::observe`] call handles one sample. The host lock is
//! held for the whole read-modify-write-log sequence, so observations for
//! the same host are applied one at a time while different hosts proceed
//! in parallel.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use hostwatch_state::tables::KEY_SEPARATOR;
use hostwatch_state::{FailureLogEntry, HostStatus, NotificationOutcome, RequestLogEntry, Status};

use crate::artifact::{ArtifactSink, FailureArtifact};
use crate::backoff::notification_due;
use crate::config::{DecisionConfig, NotifyConfig};
use crate::error::{MonitorError, MonitorResult};
use crate::iteration::IterationTracker;
use crate::message::{Message, MessageContext};
use crate::notify::Notifier;
use crate::store::MonitorStore;

/// One classified sample from the sampling harness.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Observation {
    pub host: String,
    pub label: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub response_headers: Option<String>,
    #[serde(default)]
    pub response_body: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    /// Condition reported by the harness; absent means `UNKNOWN`.
    #[serde(default)]
    pub condition: Option<Status>,
    /// Whether notifications are enabled for this sample.
    #[serde(default = "default_notify")]
    pub notify: bool,
}

fn default_notify() -> bool {
    true
}

impl Observation {
    pub fn success(host: impl Into<String>, label: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            host: host.into(),
            label: label.into(),
            success: true,
            timestamp,
            duration_ms: 0,
            error: None,
            response_headers: None,
            response_body: None,
            user: None,
            condition: None,
            notify: true,
        }
    }

    pub fn failure(
        host: impl Into<String>,
        label: impl Into<String>,
        timestamp: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::success(host, label, timestamp)
        }
    }

    pub fn with_condition(mut self, condition: Status) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    /// The reported condition, `UNKNOWN` when absent.
    pub fn condition(&self) -> Status {
        self.condition.unwrap_or(Status::Unknown)
    }

    fn validate(&self) -> MonitorResult<()> {
        if self.host.trim().is_empty() {
            return Err(MonitorError::InvalidObservation("host name is empty".to_string()));
        }
        if self.label.trim().is_empty() {
            return Err(MonitorError::InvalidObservation(format!(
                "label is empty for host '{}'",
                self.host
            )));
        }
        if self.host.contains(KEY_SEPARATOR) || self.label.contains(KEY_SEPARATOR) {
            return Err(MonitorError::InvalidObservation(format!(
                "host '{}' or label '{}' contains a control separator",
                self.host.escape_debug(),
                self.label.escape_debug()
            )));
        }
        Ok(())
    }
}

/// Result of one observation.
#[derive(Debug, Clone)]
pub struct ObservationOutcome {
    /// Host status after the observation was applied.
    pub status: HostStatus,
    /// Recorded outcome when a failure-log row was written.
    pub notification: Option<NotificationOutcome>,
    /// Subject and body recorded with that row.
    pub message: Option<Message>,
}

impl ObservationOutcome {
    /// True when a message was handed to the notifier.
    pub fn sent(&self) -> bool {
        self.notification == Some(NotificationOutcome::Sent)
    }
}

pub struct MonitorEngine<S> {
    store: Arc<S>,
    decision: DecisionConfig,
    recipients: NotifyConfig,
    notifier: Arc<dyn Notifier>,
    artifacts: Option<Arc<dyn ArtifactSink>>,
}

impl<S: MonitorStore> MonitorEngine<S> {
    pub fn new(
        store: Arc<S>,
        decision: DecisionConfig,
        recipients: NotifyConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            decision,
            recipients,
            notifier,
            artifacts: None,
        }
    }

    /// Hand every failed observation to `sink`.
    pub fn with_artifact_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.artifacts = Some(sink);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn decision(&self) -> &DecisionConfig {
        &self.decision
    }

    /// Apply one observation and record it, tracking the host in
    /// `tracker` unless it is out of rotation and down.
    pub fn observe_in(
        &self,
        tracker: &mut IterationTracker,
        observation: &Observation,
    ) -> MonitorResult<ObservationOutcome> {
        observation.validate()?;
        if observation.condition() != Status::OutDown {
            tracker.visit(&observation.host);
        }
        self.observe(observation)
    }

    /// Apply one observation and record it.
    pub fn observe(&self, observation: &Observation) -> MonitorResult<ObservationOutcome> {
        observation.validate()?;

        let host = observation.host.as_str();
        let lock = self.store.host_lock(host);
        let _guard = lock.lock();

        let mut status = self.store.get_host_status(host)?;
        let condition = observation.condition();
        debug!(
            %host,
            label = %observation.label,
            success = observation.success,
            %condition,
            current = %status.status,
            "observation"
        );

        if condition == Status::OutDown {
            if status.status != Status::OutDown {
                let previous = status.status;
                status.status = Status::OutDown;
                self.store.store_host_status(&mut status)?;
                info!(%host, from = %previous, to = %status.status, "host status changed");
            }
            return Ok(ObservationOutcome {
                status,
                notification: None,
                message: None,
            });
        }

        let (notification, message) = if observation.success {
            self.on_success(observation, condition, &mut status)?
        } else {
            self.on_failure(observation, condition, &mut status)?
        };

        let request = RequestLogEntry {
            host: observation.host.clone(),
            label: observation.label.clone(),
            last_sample: observation.timestamp,
            duration_ms: observation.duration_ms,
            success: observation.success,
        };
        self.store.log_request_and_status(&mut status, &request)?;

        Ok(ObservationOutcome {
            status,
            notification,
            message,
        })
    }

    fn on_success(
        &self,
        observation: &Observation,
        condition: Status,
        status: &mut HostStatus,
    ) -> MonitorResult<(Option<NotificationOutcome>, Option<Message>)> {
        let resolved = if condition.is_out() { Status::OutUp } else { Status::Up };

        if status.failure_count == 0 {
            if status.status != resolved {
                let previous = status.status;
                status.status = resolved;
                self.store.store_host_status(status)?;
                info!(host = %status.host, from = %previous, to = %resolved, "host status changed");
            }
            return Ok((None, None));
        }

        let message = self.render(&MessageContext {
            prefix: &self.decision.subject_prefix,
            host: &observation.host,
            label: &observation.label,
            time: observation.timestamp,
            status: Status::Up,
            message_count: 0,
            failure_count: 0,
            errors: None,
        });

        // An UP message only follows a DOWN message.
        let outcome = if status.message_count > 0 {
            status.last_message_sent = Some(observation.timestamp);
            self.dispatch(&message, observation.notify)
        } else {
            NotificationOutcome::NotSent
        };

        let failures = status.failure_count;
        status.failure_count = 0;
        status.message_count = 0;
        status.status = resolved;

        let entry = FailureLogEntry {
            host: observation.host.clone(),
            label: observation.label.clone(),
            failure_time: observation.timestamp,
            status: resolved,
            subject: message.subject.clone(),
            body: message.body.clone(),
            outcome,
        };
        self.store.log_failure_and_status(status, &entry)?;
        info!(host = %status.host, status = %resolved, failures, %outcome, "host recovered");

        Ok((Some(outcome), Some(message)))
    }

    fn on_failure(
        &self,
        observation: &Observation,
        condition: Status,
        status: &mut HostStatus,
    ) -> MonitorResult<(Option<NotificationOutcome>, Option<Message>)> {
        status.failure_count = status.failure_count.saturating_add(1);
        status.status = if condition.is_out() { Status::OutDown } else { Status::Down };

        let errors = observation.error.as_deref().unwrap_or_default();
        let mut message = self.render_failure(observation, status, errors);
        let mut outcome = NotificationOutcome::NotSent;

        let eligible =
            !condition.is_out() && status.failure_count >= self.decision.failure_threshold;
        if eligible
            && notification_due(
                status.message_count,
                self.decision.backoff_minutes,
                status.last_message_sent,
                observation.timestamp,
            )
        {
            // Counters advance whether or not delivery is enabled.
            status.message_count = status.message_count.saturating_add(1);
            status.last_message_sent = Some(observation.timestamp);
            message = self.render_failure(observation, status, errors);
            outcome = self.dispatch(&message, observation.notify);
        }

        let entry = FailureLogEntry {
            host: observation.host.clone(),
            label: observation.label.clone(),
            failure_time: observation.timestamp,
            status: status.status,
            subject: message.subject.clone(),
            body: message.body.clone(),
            outcome,
        };
        self.store.log_failure_and_status(status, &entry)?;
        debug!(
            host = %status.host,
            failure_count = status.failure_count,
            message_count = status.message_count,
            %outcome,
            "failure recorded"
        );

        self.save_artifact(observation, status, errors);

        Ok((Some(outcome), Some(message)))
    }

    fn render_failure(&self, observation: &Observation, status: &HostStatus, errors: &str) -> Message {
        self.render(&MessageContext {
            prefix: &self.decision.subject_prefix,
            host: &observation.host,
            label: &observation.label,
            time: observation.timestamp,
            status: status.status,
            message_count: status.message_count,
            failure_count: status.failure_count,
            errors: Some(errors),
        })
    }

    fn render(&self, context: &MessageContext<'_>) -> Message {
        Message {
            to: self.recipients.to.clone(),
            from: self.recipients.from.clone(),
            subject: context.subject(),
            body: context.body(),
        }
    }

    fn dispatch(&self, message: &Message, enabled: bool) -> NotificationOutcome {
        if !enabled {
            debug!(subject = %message.subject, "notification suppressed by configuration");
            return NotificationOutcome::SuppressedByConfig;
        }
        if let Err(e) = self.notifier.send(message) {
            error!(subject = %message.subject, error = %e, "failed to send notification");
        }
        NotificationOutcome::Sent
    }

    fn save_artifact(&self, observation: &Observation, status: &HostStatus, errors: &str) {
        let Some(sink) = &self.artifacts else {
            return;
        };
        let artifact = FailureArtifact {
            host: observation.host.clone(),
            label: observation.label.clone(),
            time: observation.timestamp,
            user: observation.user.clone(),
            failure_count: status.failure_count,
            message_count: status.message_count,
            errors: errors.to_string(),
            response_headers: observation.response_headers.clone().unwrap_or_default(),
            response_body: observation.response_body.clone().unwrap_or_default(),
        };
        if let Err(e) = sink.persist(&artifact) {
            warn!(host = %observation.host, error = %e, "failed to save failed response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use parking_lot::Mutex;

    use hostwatch_state::{StatusBackend, StatusDb};

    use crate::notify::{MemoryNotifier, NotifyError};
    use crate::store::CachingStore;

    struct Harness {
        engine: MonitorEngine<CachingStore>,
        notifier: Arc<MemoryNotifier>,
        db: StatusDb,
    }

    fn harness() -> Harness {
        let db = StatusDb::open_in_memory().unwrap();
        let store = Arc::new(CachingStore::new(Arc::new(db.clone())));
        let notifier = Arc::new(MemoryNotifier::new());
        let engine = MonitorEngine::new(
            store,
            DecisionConfig::default(),
            NotifyConfig::default(),
            notifier.clone(),
        );
        Harness { engine, notifier, db }
    }

    fn minute(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(n)
    }

    fn fail(engine: &MonitorEngine<CachingStore>, at: i64) -> ObservationOutcome {
        engine
            .observe(&Observation::failure("web-1", "login", minute(at), "HTTP 503"))
            .unwrap()
    }

    #[test]
    fn backoff_timeline() {
        let h = harness();

        let first = fail(&h.engine, 2);
        assert_eq!(first.status.failure_count, 1);
        assert_eq!(first.notification, Some(NotificationOutcome::NotSent));

        let second = fail(&h.engine, 3);
        assert!(second.sent());
        assert_eq!(second.status.message_count, 1);
        assert_eq!(second.status.last_message_sent, Some(minute(3)));
        assert_eq!(
            second.message.unwrap().subject,
            "hostwatch: web-1 DOWN (fc=2, mc=1)"
        );

        let third = fail(&h.engine, 10);
        assert!(!third.sent());
        assert_eq!(third.status.message_count, 1);

        let fourth = fail(&h.engine, 20);
        assert!(fourth.sent());
        assert_eq!(fourth.status.message_count, 2);
        assert_eq!(fourth.status.failure_count, 4);

        // Next gap is 30 minutes after t=20.
        assert!(!fail(&h.engine, 50).sent());
        assert!(fail(&h.engine, 51).sent());

        assert_eq!(h.notifier.len(), 3);
        assert_eq!(h.db.list_failures_for_host("web-1").unwrap().len(), 6);
    }

    #[test]
    fn recovery_resets_counters_and_sends_up_message() {
        let h = harness();
        fail(&h.engine, 0);
        fail(&h.engine, 1);

        let up = h
            .engine
            .observe(&Observation::success("web-1", "login", minute(2)))
            .unwrap();
        assert!(up.sent());
        assert_eq!(up.status.status, Status::Up);
        assert_eq!(up.status.failure_count, 0);
        assert_eq!(up.status.message_count, 0);
        assert_eq!(up.status.last_message_sent, Some(minute(2)));
        assert_eq!(up.message.unwrap().subject, "hostwatch: web-1 UP");

        let persisted = h.db.load_host_status("web-1").unwrap().unwrap();
        assert_eq!(persisted.status, Status::Up);
        assert_eq!(persisted.failure_count, 0);
        assert_eq!(h.notifier.len(), 2);
    }

    #[test]
    fn recovery_without_prior_message_is_silent() {
        let h = harness();
        fail(&h.engine, 0);

        let up = h
            .engine
            .observe(&Observation::success("web-1", "login", minute(1)))
            .unwrap();
        assert_eq!(up.notification, Some(NotificationOutcome::NotSent));
        assert_eq!(up.status.failure_count, 0);
        assert!(up.status.last_message_sent.is_none());
        assert!(h.notifier.is_empty());

        let failures = h.db.list_failures_for_host("web-1").unwrap();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[1].status, Status::Up);
    }

    #[test]
    fn disabled_recovery_is_suppressed_but_still_resets() {
        let h = harness();
        fail(&h.engine, 0);
        assert!(fail(&h.engine, 1).sent());

        let up = h
            .engine
            .observe(&Observation::success("web-1", "login", minute(2)).with_notify(false))
            .unwrap();
        assert_eq!(up.notification, Some(NotificationOutcome::SuppressedByConfig));
        assert_eq!(up.status.status, Status::Up);
        assert_eq!(up.status.failure_count, 0);
        assert_eq!(up.status.message_count, 0);
        assert_eq!(up.status.last_message_sent, Some(minute(2)));
        // Only the DOWN message went out.
        assert_eq!(h.notifier.len(), 1);

        let failures = h.db.list_failures_for_host("web-1").unwrap();
        let recovery = failures.last().unwrap();
        assert_eq!(recovery.status, Status::Up);
        assert_eq!(recovery.outcome, NotificationOutcome::SuppressedByConfig);
        assert_eq!(recovery.subject, "hostwatch: web-1 UP");
    }

    #[test]
    fn out_of_rotation_recovery_resolves_to_out_up() {
        let h = harness();
        fail(&h.engine, 0);
        fail(&h.engine, 1);
        fail(&h.engine, 2);

        let up = h
            .engine
            .observe(&Observation::success("web-1", "login", minute(3)).with_condition(Status::OutUp))
            .unwrap();
        assert!(up.sent());
        assert_eq!(up.status.status, Status::OutUp);
        assert_eq!(up.status.failure_count, 0);
        assert_eq!(up.status.message_count, 0);

        let persisted = h.db.load_host_status("web-1").unwrap().unwrap();
        assert_eq!(persisted.status, Status::OutUp);
        assert_eq!(persisted.failure_count, 0);
        assert_eq!(persisted.message_count, 0);

        let failures = h.db.list_failures_for_host("web-1").unwrap();
        assert_eq!(failures.len(), 4);
        let recovery = failures.last().unwrap();
        assert_eq!(recovery.status, Status::OutUp);
        assert_eq!(recovery.outcome, NotificationOutcome::Sent);
        assert_eq!(recovery.failure_time, minute(3));
    }

    #[test]
    fn huge_backoff_never_panics_and_never_renotifies() {
        let db = StatusDb::open_in_memory().unwrap();
        let mut seeded = HostStatus::new("web-1");
        seeded.status = Status::Down;
        seeded.failure_count = 40;
        seeded.message_count = 17;
        seeded.last_message_sent = Some(minute(0));
        db.put_host_status(&seeded).unwrap();

        let notifier = Arc::new(MemoryNotifier::new());
        let engine = MonitorEngine::new(
            Arc::new(CachingStore::new(Arc::new(db))),
            DecisionConfig {
                backoff_minutes: u32::MAX,
                ..DecisionConfig::default()
            },
            NotifyConfig::default(),
            notifier.clone(),
        );

        let outcome = fail(&engine, 60 * 24 * 365);
        assert_eq!(outcome.notification, Some(NotificationOutcome::NotSent));
        assert_eq!(outcome.status.failure_count, 41);
        assert_eq!(outcome.status.message_count, 17);
        assert!(notifier.is_empty());
    }

    #[test]
    fn disabled_notifications_advance_counters_identically() {
        let enabled = harness();
        let disabled = harness();

        for at in [0, 1, 5, 20, 40] {
            let obs = Observation::failure("web-1", "login", minute(at), "HTTP 500");
            let a = enabled.engine.observe(&obs).unwrap();
            let b = disabled.engine.observe(&obs.clone().with_notify(false)).unwrap();

            assert_eq!(a.status.failure_count, b.status.failure_count);
            assert_eq!(a.status.message_count, b.status.message_count);
            assert_eq!(a.status.last_message_sent, b.status.last_message_sent);
            if a.sent() {
                assert_eq!(b.notification, Some(NotificationOutcome::SuppressedByConfig));
                assert_eq!(a.message, b.message);
            }
        }
        assert!(disabled.notifier.is_empty());
        assert!(!enabled.notifier.is_empty());
    }

    #[test]
    fn out_of_rotation_failures_never_notify() {
        let h = harness();
        for at in 0..5 {
            let out = h
                .engine
                .observe(
                    &Observation::failure("web-1", "login", minute(at), "refused")
                        .with_condition(Status::OutUp),
                )
                .unwrap();
            assert_eq!(out.status.status, Status::OutDown);
            assert_eq!(out.notification, Some(NotificationOutcome::NotSent));
        }
        assert_eq!(h.engine.store().cached("web-1").unwrap().failure_count, 5);
        assert!(h.notifier.is_empty());
    }

    #[test]
    fn out_down_condition_only_sets_status() {
        let h = harness();
        fail(&h.engine, 0);
        fail(&h.engine, 1);

        let outcome = h
            .engine
            .observe(
                &Observation::success("web-1", "login", minute(2)).with_condition(Status::OutDown),
            )
            .unwrap();
        assert_eq!(outcome.status.status, Status::OutDown);
        assert_eq!(outcome.status.failure_count, 2);
        assert_eq!(outcome.status.message_count, 1);
        assert!(outcome.notification.is_none());

        let requests = h.db.list_requests_for_host("web-1").unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].last_sample, minute(1));
    }

    #[test]
    fn success_switches_status_without_notification() {
        let h = harness();
        let up = h
            .engine
            .observe(&Observation::success("web-1", "login", minute(0)))
            .unwrap();
        assert_eq!(up.status.status, Status::Up);
        assert!(up.notification.is_none());

        let out = h
            .engine
            .observe(&Observation::success("web-1", "login", minute(1)).with_condition(Status::OutUp))
            .unwrap();
        assert_eq!(out.status.status, Status::OutUp);
        assert!(h.notifier.is_empty());
        assert!(h.db.list_failures_for_host("web-1").unwrap().is_empty());
    }

    #[test]
    fn failures_below_threshold_do_not_notify() {
        let db = StatusDb::open_in_memory().unwrap();
        let notifier = Arc::new(MemoryNotifier::new());
        let engine = MonitorEngine::new(
            Arc::new(CachingStore::new(Arc::new(db))),
            DecisionConfig {
                failure_threshold: 3,
                ..DecisionConfig::default()
            },
            NotifyConfig::default(),
            notifier.clone(),
        );

        assert!(!fail(&engine, 0).sent());
        assert!(!fail(&engine, 1).sent());
        assert!(fail(&engine, 2).sent());
        assert_eq!(notifier.len(), 1);
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn send(&self, _message: &Message) -> Result<(), NotifyError> {
            Err(NotifyError::Transport("smtp unreachable".to_string()))
        }
    }

    #[test]
    fn notifier_failure_keeps_counters() {
        let db = StatusDb::open_in_memory().unwrap();
        let engine = MonitorEngine::new(
            Arc::new(CachingStore::new(Arc::new(db))),
            DecisionConfig::default(),
            NotifyConfig::default(),
            Arc::new(FailingNotifier),
        );

        fail(&engine, 0);
        let outcome = fail(&engine, 1);
        assert_eq!(outcome.notification, Some(NotificationOutcome::Sent));
        assert_eq!(outcome.status.message_count, 1);
    }

    #[derive(Default)]
    struct RecordingSink {
        artifacts: Mutex<Vec<FailureArtifact>>,
    }

    impl ArtifactSink for RecordingSink {
        fn persist(&self, artifact: &FailureArtifact) -> std::io::Result<()> {
            self.artifacts.lock().push(artifact.clone());
            Ok(())
        }
    }

    #[test]
    fn every_failure_produces_an_artifact_with_updated_counts() {
        let sink = Arc::new(RecordingSink::default());
        let h = harness();
        let engine = h.engine.with_artifact_sink(sink.clone());

        let mut obs = Observation::failure("web-1", "login", minute(0), "HTTP 502");
        obs.response_body = Some("bad gateway".to_string());
        engine.observe(&obs).unwrap();
        obs.timestamp = minute(1);
        engine.observe(&obs).unwrap();
        engine
            .observe(&Observation::success("web-1", "login", minute(2)))
            .unwrap();

        let artifacts = sink.artifacts.lock();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[1].failure_count, 2);
        assert_eq!(artifacts[1].message_count, 1);
        assert_eq!(artifacts[1].response_body, "bad gateway");
        assert_eq!(artifacts[1].errors, "HTTP 502");
    }

    #[test]
    fn key_separator_in_host_or_label_is_rejected() {
        let h = harness();
        for obs in [
            Observation::success("a", "b\u{1f}c", minute(0)),
            Observation::success("a\u{1f}b", "c", minute(0)),
        ] {
            let err = h.engine.observe(&obs).unwrap_err();
            assert!(matches!(err, MonitorError::InvalidObservation(_)));
        }
        assert_eq!(h.engine.store().cached_hosts(), 0);
        assert!(h.db.list_host_statuses().unwrap().is_empty());
    }

    #[test]
    fn empty_host_or_label_is_rejected() {
        let h = harness();
        let err = h
            .engine
            .observe(&Observation::success("", "login", minute(0)))
            .unwrap_err();
        assert!(matches!(err, MonitorError::InvalidObservation(_)));

        let err = h
            .engine
            .observe(&Observation::success("web-1", " ", minute(0)))
            .unwrap_err();
        assert!(matches!(err, MonitorError::InvalidObservation(_)));
        assert_eq!(h.engine.store().cached_hosts(), 0);
    }

    #[test]
    fn observe_in_tracks_hosts_except_out_down() {
        let h = harness();
        let mut tracker = IterationTracker::new();

        h.engine
            .observe_in(&mut tracker, &Observation::success("web-1", "login", minute(0)))
            .unwrap();
        h.engine
            .observe_in(
                &mut tracker,
                &Observation::success("web-2", "login", minute(0)).with_condition(Status::OutDown),
            )
            .unwrap();
        h.engine
            .observe_in(&mut tracker, &Observation::success("web-1", "logout", minute(0)))
            .unwrap();

        assert_eq!(tracker.visited(), ["web-1".to_string()]);
    }

    #[test]
    fn observation_parses_from_json() {
        let obs: Observation = serde_json::from_str(
            r#"{"host":"web-1","label":"login","success":false,
                "timestamp":"2024-03-01T12:00:00Z","error":"HTTP 500",
                "condition":"OUT_UP"}"#,
        )
        .unwrap();
        assert_eq!(obs.condition(), Status::OutUp);
        assert!(obs.notify);
        assert_eq!(obs.duration_ms, 0);
    }
}
