//! Shared building blocks for the gateway, orders service and saga worker.
//!
//! Value types (endpoint identities, the event envelope that travels through
//! the broker, the order record exchanged with downstream services) plus the
//! process plumbing every binary needs: environment configuration helpers,
//! logging, the Prometheus recorder and shutdown signalling.

pub mod config;
pub mod envelope;
pub mod errors;
pub mod telemetry;
pub mod topology;
pub mod types;

pub use envelope::EventEnvelope;
pub use types::{OrderRecord, ServiceEndpoint};
