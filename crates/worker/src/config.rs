//! Worker configuration loaded from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use common::ServiceEndpoint;
use common::config::{DEFAULT_RABBITMQ_URL, env_lookup, millis_or, parse_or, string_or};
use common::topology::{EVENTS_EXCHANGE, EVENTS_QUEUE};
use event_bus::{RabbitMqConfig, ReconnectPolicy};

/// Worker configuration.
///
/// Reads from environment variables:
/// - `RABBITMQ_URL`: broker connection string
/// - `EVENTS_EXCHANGE`: fan-out exchange to bind to (default: `micro.events`)
/// - `EVENTS_QUEUE`: durable queue to consume (default: `micro_events_q`)
/// - `PAYMENTS_URL`: payment service base URL
/// - `DOWNSTREAM_TIMEOUT_MS`: deadline for payment calls (default: `5000`)
/// - `RECONNECT_MAX_BACKOFF_MS`: cap on reconnect backoff (default: `30000`)
/// - `METRICS_ADDR`: Prometheus scrape address (default: `0.0.0.0:9100`)
#[derive(Debug, Clone)]
pub struct Config {
    pub rabbitmq_url: String,
    pub events_exchange: String,
    pub events_queue: String,
    pub payments_url: ServiceEndpoint,
    pub downstream_timeout: Duration,
    pub reconnect_max_backoff: Duration,
    pub metrics_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            rabbitmq_url: string_or(&lookup, "RABBITMQ_URL", DEFAULT_RABBITMQ_URL),
            events_exchange: string_or(&lookup, "EVENTS_EXCHANGE", EVENTS_EXCHANGE),
            events_queue: string_or(&lookup, "EVENTS_QUEUE", EVENTS_QUEUE),
            payments_url: string_or(&lookup, "PAYMENTS_URL", "http://payments-service:5002").into(),
            downstream_timeout: millis_or(&lookup, "DOWNSTREAM_TIMEOUT_MS", 5000),
            reconnect_max_backoff: millis_or(&lookup, "RECONNECT_MAX_BACKOFF_MS", 30_000),
            metrics_addr: parse_or(
                &lookup,
                "METRICS_ADDR",
                SocketAddr::from(([0, 0, 0, 0], 9100)),
            ),
        }
    }

    /// Broker settings for the consumer connection.
    pub fn broker(&self) -> RabbitMqConfig {
        let reconnect = ReconnectPolicy {
            max_backoff: self.reconnect_max_backoff,
            ..ReconnectPolicy::default()
        };
        RabbitMqConfig::new(self.rabbitmq_url.clone())
            .with_connection_name("saga-worker")
            .with_reconnect(reconnect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.rabbitmq_url, DEFAULT_RABBITMQ_URL);
        assert_eq!(config.events_exchange, "micro.events");
        assert_eq!(config.events_queue, "micro_events_q");
        assert_eq!(config.payments_url.as_str(), "http://payments-service:5002");
        assert_eq!(config.downstream_timeout, Duration::from_secs(5));
        assert_eq!(config.metrics_addr.to_string(), "0.0.0.0:9100");
        assert_eq!(config.broker().reconnect.max_backoff, Duration::from_secs(30));
        assert_eq!(config.broker().prefetch_count, 1);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(|key: &str| match key {
            "EVENTS_QUEUE" => Some("audit_q".to_string()),
            "RECONNECT_MAX_BACKOFF_MS" => Some("1000".to_string()),
            "DOWNSTREAM_TIMEOUT_MS" => Some("soon".to_string()),
            "METRICS_ADDR" => Some("127.0.0.1:9200".to_string()),
            _ => None,
        });
        assert_eq!(config.events_queue, "audit_q");
        assert_eq!(config.reconnect_max_backoff, Duration::from_secs(1));
        assert_eq!(config.downstream_timeout, Duration::from_secs(5));
        assert_eq!(config.metrics_addr, SocketAddr::from(([127, 0, 0, 1], 9200)));
    }

    #[test]
    fn test_invalid_metrics_addr_falls_back() {
        let config = Config::from_lookup(|key: &str| (key == "METRICS_ADDR").then(|| "9100".to_string()));
        assert_eq!(config.metrics_addr.port(), 9100);
        assert!(config.metrics_addr.ip().is_unspecified());
    }
}
