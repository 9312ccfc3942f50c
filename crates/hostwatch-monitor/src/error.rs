//! Monitor error types.

use thiserror::Error;

/// Errors that can occur while processing an observation.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("invalid observation: {0}")]
    InvalidObservation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("state store error: {0}")]
    State(#[from] hostwatch_state::StateError),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
