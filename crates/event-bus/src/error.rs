//! Event bus error types.

use thiserror::Error;

/// Errors that can occur when talking to the broker.
#[derive(Debug, Error)]
pub enum BusError {
    /// The broker could not be reached, or the connection dropped.
    #[error("Broker connection failed: {0}")]
    Connection(String),

    /// Declaring or binding an exchange or queue failed.
    #[error("Topology error on '{name}': {reason}")]
    Topology { name: String, reason: String },

    /// Publishing to an exchange failed.
    #[error("Publish to exchange '{exchange}' failed: {reason}")]
    Publish { exchange: String, reason: String },

    /// Starting or continuing a consumer failed.
    #[error("Consume from queue '{queue}' failed: {reason}")]
    Consume { queue: String, reason: String },

    /// Acknowledging a delivery failed.
    #[error("Acknowledgement failed: {0}")]
    Ack(String),

    /// An envelope could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BusError {
    pub fn connection(reason: impl std::fmt::Display) -> Self {
        BusError::Connection(reason.to_string())
    }

    pub fn topology(name: &str, reason: impl std::fmt::Display) -> Self {
        BusError::Topology {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn publish(exchange: &str, reason: impl std::fmt::Display) -> Self {
        BusError::Publish {
            exchange: exchange.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn consume(queue: &str, reason: impl std::fmt::Display) -> Self {
        BusError::Consume {
            queue: queue.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if the error means the broker is unreachable.
    pub fn is_connection(&self) -> bool {
        matches!(self, BusError::Connection(_))
    }
}

/// Result type for event bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
