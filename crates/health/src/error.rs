//! Health probing error types.

use thiserror::Error;

/// Errors raised while setting up health probing.
///
/// Individual probe failures are not errors; they are reported as
/// `offline` results.
#[derive(Debug, Error)]
pub enum HealthError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Convenience type alias for health results.
pub type Result<T> = std::result::Result<T, HealthError>;
