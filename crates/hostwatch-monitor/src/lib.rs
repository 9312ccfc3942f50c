//! hostwatch-monitor: host status tracking and alert throttling.
//!
//! Turns a stream of classified samples into per-host status transitions,
//! decides when a down host is worth telling an operator about, and backs
//! off exponentially while it stays down. Storage sits behind a cache and
//! a fault-isolating wrapper, so a database outage degrades the monitor to
//! memory-only operation instead of stopping it.
//!
//! # Architecture
//!
//! ```text
//! MonitorEngine::observe(Observation)
//!   ├── host lock (one ReentrantMutex per host)
//!   ├── ErrorHandlingStore (logs and swallows storage errors)
//!   │   └── CachingStore (DashMap cache + locks)
//!   │       └── StatusBackend (redb StatusDb)
//!   ├── notification_due() → exponential backoff
//!   ├── Notifier (LogNotifier, MemoryNotifier)
//!   └── ArtifactSink (ResponseFileSink)
//!
//! Purger (background tokio task)
//!   └── failure log, request log, status cache retention
//! ```
//!
//! # Backoff
//!
//! The first message for a down host goes out once `failure_threshold`
//! consecutive failures are seen. Each further message waits
//! `backoff_minutes * 2^(message_count - 1)` after the previous one.
//! A successful sample resets both counters.

pub mod artifact;
pub mod backoff;
pub mod config;
pub mod engine;
pub mod error;
pub mod iteration;
pub mod message;
pub mod notify;
pub mod purge;
pub mod resilient;
pub mod store;

pub use artifact::{ArtifactSink, FailureArtifact, ResponseFileSink};
pub use backoff::{notification_due, notification_gap};
pub use config::MonitorConfig;
pub use engine::{MonitorEngine, Observation, ObservationOutcome};
pub use error::{MonitorError, MonitorResult};
pub use iteration::IterationTracker;
pub use message::Message;
pub use notify::{LogNotifier, MemoryNotifier, Notifier, NotifyError};
pub use purge::{Purger, spawn_purge_task};
pub use resilient::ErrorHandlingStore;
pub use store::{CachingStore, HostLock, MonitorStore};
