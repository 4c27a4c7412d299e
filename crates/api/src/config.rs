//! Service configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use common::ServiceEndpoint;
use common::config::{DEFAULT_RABBITMQ_URL, env_lookup, millis_or, parse_or, string_or};
use common::topology::EVENTS_EXCHANGE;

/// Backend services probed by the gateway when `SERVICES_LIST` is unset.
pub const DEFAULT_SERVICES: &str = "http://orders:5001,http://payments:5002,http://logs:5003,http://notifications:5004,http://metricas:5005";

/// Gateway configuration.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `8000`)
/// - `SERVICES_LIST`: comma-separated backend base URLs to probe
/// - `PROBE_TIMEOUT_MS`: per-probe deadline (default: `2000`)
/// - `RABBITMQ_URL`: broker connection string
/// - `EVENTS_EXCHANGE`: fan-out exchange for published events
/// - `ORDERS_URL`, `PAYMENTS_URL`, `NOTIFICATIONS_URL`, `LOGS_URL`,
///   `METRICS_URL`: pass-through targets
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub services: Vec<ServiceEndpoint>,
    pub probe_timeout: Duration,
    pub rabbitmq_url: String,
    pub events_exchange: String,
    pub orders_url: ServiceEndpoint,
    pub payments_url: ServiceEndpoint,
    pub notifications_url: ServiceEndpoint,
    pub logs_url: ServiceEndpoint,
    pub metrics_url: ServiceEndpoint,
}

impl GatewayConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    /// Loads configuration through `lookup` instead of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: string_or(&lookup, "HOST", "0.0.0.0"),
            port: parse_or(&lookup, "PORT", 8000),
            services: ServiceEndpoint::parse_list(&string_or(
                &lookup,
                "SERVICES_LIST",
                DEFAULT_SERVICES,
            )),
            probe_timeout: millis_or(&lookup, "PROBE_TIMEOUT_MS", 2000),
            rabbitmq_url: string_or(&lookup, "RABBITMQ_URL", DEFAULT_RABBITMQ_URL),
            events_exchange: string_or(&lookup, "EVENTS_EXCHANGE", EVENTS_EXCHANGE),
            orders_url: string_or(&lookup, "ORDERS_URL", "http://orders:5001").into(),
            payments_url: string_or(&lookup, "PAYMENTS_URL", "http://payments:5002").into(),
            notifications_url: string_or(&lookup, "NOTIFICATIONS_URL", "http://notifications:5004")
                .into(),
            logs_url: string_or(&lookup, "LOGS_URL", "http://logs:5003").into(),
            metrics_url: string_or(&lookup, "METRICS_URL", "http://metricas:5005").into(),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// When the order side effects run relative to the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SideEffectsMode {
    /// Side effects finish before the response is sent.
    #[default]
    Inline,
    /// Side effects run as a background task after the order is stored.
    Detached,
}

impl FromStr for SideEffectsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "detached" => Ok(Self::Detached),
            other => Err(format!("unknown side effects mode: {other}")),
        }
    }
}

/// Orders service configuration.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `5001`)
/// - `PAYMENTS_URL`: payment service base URL
/// - `NOTIFICATIONS_URL`: notification service base URL
/// - `SIDE_EFFECT_TIMEOUT_MS`: deadline per side-effect call (default: `3000`)
/// - `SIDE_EFFECTS_MODE`: `inline` or `detached` (default: `inline`)
#[derive(Debug, Clone)]
pub struct OrdersConfig {
    pub host: String,
    pub port: u16,
    pub payments_url: ServiceEndpoint,
    pub notifications_url: ServiceEndpoint,
    pub side_effect_timeout: Duration,
    pub side_effects_mode: SideEffectsMode,
}

impl OrdersConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: string_or(&lookup, "HOST", "0.0.0.0"),
            port: parse_or(&lookup, "PORT", 5001),
            payments_url: string_or(&lookup, "PAYMENTS_URL", "http://payments:5002").into(),
            notifications_url: string_or(&lookup, "NOTIFICATIONS_URL", "http://notifications:5004")
                .into(),
            side_effect_timeout: millis_or(&lookup, "SIDE_EFFECT_TIMEOUT_MS", 3000),
            side_effects_mode: parse_or(&lookup, "SIDE_EFFECTS_MODE", SideEffectsMode::Inline),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
