//! Notification dispatch.
//!
//! The engine decides whether and what to send; a [`Notifier`] delivers.
//! Delivery failures are logged by the engine and never roll back the
//! counters that led to the send.

use parking_lot::Mutex;
use thiserror::Error;
use tracing::warn;

use crate::message::Message;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),
}

/// Delivers rendered messages to operators.
pub trait Notifier: Send + Sync {
    fn send(&self, message: &Message) -> Result<(), NotifyError>;
}

/// Emits each message as a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, message: &Message) -> Result<(), NotifyError> {
        warn!(
            to = %message.to,
            from = %message.from,
            subject = %message.subject,
            body = %message.body,
            "host notification"
        );
        Ok(())
    }
}

/// Keeps every message in memory. Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Message>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first.
    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, message: &Message) -> Result<(), NotifyError> {
        self.sent.lock().push(message.clone());
        Ok(())
    }
}
