//! JSON-lines event intake.
//!
//! Each input line is one event:
//!
//! ```text
//! {"type":"iteration"}
//! {"type":"sample","host":"web-1","label":"login","success":false,
//!  "timestamp":"2024-03-01T12:00:00Z","error":"HTTP 503"}
//! ```

use hostwatch_monitor::{IterationTracker, MonitorEngine, MonitorStore, Observation};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Sample(Observation),
    Iteration,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub samples: u64,
    pub notifications: u64,
    pub iterations: u64,
    pub rejected: u64,
}

/// Feeds events into an engine, tracking iterations as they arrive.
pub struct Ingestor<S> {
    engine: MonitorEngine<S>,
    tracker: IterationTracker,
    stats: IngestStats,
}

impl<S: MonitorStore> Ingestor<S> {
    pub fn new(engine: MonitorEngine<S>) -> Self {
        Self {
            engine,
            tracker: IterationTracker::new(),
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Handle one input line. Malformed lines and rejected observations
    /// are logged and counted, never fatal.
    pub fn handle_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let event: Event = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "skipping malformed event");
                self.stats.rejected += 1;
                return;
            }
        };
        self.handle(event);
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Iteration => {
                let store = self.engine.store().as_ref();
                if let Err(e) = self.tracker.begin_iteration(store) {
                    warn!(error = %e, "failed to start iteration");
                }
                self.stats.iterations += 1;
                debug!(iteration = self.stats.iterations, "iteration started");
            }
            Event::Sample(observation) => {
                match self.engine.observe_in(&mut self.tracker, &observation) {
                    Ok(outcome) => {
                        self.stats.samples += 1;
                        if outcome.sent() {
                            self.stats.notifications += 1;
                        }
                    }
                    Err(e) => {
                        warn!(host = %observation.host, error = %e, "observation rejected");
                        self.stats.rejected += 1;
                    }
                }
            }
        }
    }
}
