//! Health probing for the gateway.
//!
//! A [`Prober`] performs one bounded-time `GET {endpoint}/health` and
//! classifies the outcome as online, degraded, or offline. The
//! [`HealthAggregator`] runs one probe per configured endpoint concurrently
//! and returns a [`HealthReport`] in configuration order.
//!
//! Probe failures never surface as errors: an unreachable or slow service
//! becomes an `offline` entry in the report.

pub mod aggregator;
pub mod error;
pub mod probe;
pub mod report;

pub use aggregator::{HealthAggregator, aggregate};
pub use error::HealthError;
pub use probe::{DEFAULT_PROBE_TIMEOUT, Prober, probe};
pub use report::{HealthReport, ProbeResult, ProbeStatus, SystemHealth};
