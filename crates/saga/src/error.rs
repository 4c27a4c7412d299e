//! Saga error types.

use event_bus::BusError;
use thiserror::Error;

/// Errors that can occur while handling events and side effects.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A message body is not a valid event envelope.
    #[error("Failed to decode event: {0}")]
    Decode(#[from] serde_json::Error),

    /// A downstream service was unreachable or answered with an error.
    #[error("{service} service call failed: {reason}")]
    Downstream { service: &'static str, reason: String },

    /// A downstream call did not finish within its deadline.
    #[error("{service} service call timed out after {timeout_ms} ms")]
    Timeout { service: &'static str, timeout_ms: u64 },

    /// Event bus error.
    #[error("Event bus error: {0}")]
    Bus(#[from] BusError),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SagaError {
    pub(crate) fn downstream(service: &'static str, reason: impl Into<String>) -> Self {
        Self::Downstream {
            service,
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
