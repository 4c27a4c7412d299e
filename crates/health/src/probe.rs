//! Single bounded-time health probe.

use std::time::{Duration, Instant};

use common::ServiceEndpoint;
use common::errors::describe;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::error::Result;
use crate::report::ProbeResult;

/// Probe timeout used when the caller does not choose one.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Issues health requests with a fixed per-probe deadline.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Prober {
    client: reqwest::Client,
    timeout: Duration,
}

impl Prober {
    /// Creates a prober whose requests never outlive `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    /// Creates a prober on top of an existing client.
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Returns the per-probe deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probes `GET {endpoint}/health`.
    ///
    /// Returns within the configured timeout. Every failure is folded into
    /// an `offline` result carrying the error text.
    #[tracing::instrument(skip(self), fields(endpoint = %endpoint))]
    pub async fn probe(&self, endpoint: &ServiceEndpoint) -> ProbeResult {
        let url = endpoint.join("/health");
        let started = Instant::now();

        let result = match tokio::time::timeout(self.timeout, self.request(&url, started)).await {
            Ok(Ok((status, latency_ms, _))) if status != StatusCode::OK => {
                ProbeResult::degraded(endpoint.clone(), latency_ms, status.as_u16())
            }
            Ok(Ok((_, latency_ms, details))) => {
                ProbeResult::online(endpoint.clone(), latency_ms, details)
            }
            Ok(Err(err)) => ProbeResult::offline(endpoint.clone(), describe(&err)),
            Err(_) => ProbeResult::offline(
                endpoint.clone(),
                format!("health check timed out after {} ms", self.timeout.as_millis()),
            ),
        };

        metrics::counter!("health_probes_total", "status" => result.status.as_str())
            .increment(1);
        metrics::histogram!("health_probe_latency_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result.error {
            Some(error) => tracing::warn!(status = %result.status, %error, "service offline"),
            None => tracing::debug!(
                status = %result.status,
                latency_ms = result.latency_ms,
                "probe finished"
            ),
        }

        result
    }

    async fn request(
        &self,
        url: &str,
        started: Instant,
    ) -> std::result::Result<(StatusCode, u64, Value), reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let latency_ms = elapsed_ms(started);
        let status = response.status();

        if status != StatusCode::OK {
            return Ok((status, latency_ms, Value::Null));
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false);

        // A 200 with an unreadable body is still online.
        let details = if is_json {
            response
                .json::<Value>()
                .await
                .unwrap_or_else(|_| Value::Object(Default::default()))
        } else {
            Value::Object(Default::default())
        };

        Ok((status, latency_ms, details))
    }
}

/// Probes one endpoint with a freshly built client.
///
/// Prefer a shared [`Prober`] when probing repeatedly.
pub async fn probe(endpoint: &ServiceEndpoint, timeout: Duration) -> ProbeResult {
    match Prober::new(timeout) {
        Ok(prober) => prober.probe(endpoint).await,
        Err(err) => ProbeResult::offline(endpoint.clone(), err.to_string()),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    (started.elapsed().as_secs_f64() * 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout_is_two_seconds() {
        assert_eq!(DEFAULT_PROBE_TIMEOUT, Duration::from_secs(2));
    }

    #[test]
    fn test_prober_keeps_timeout() {
        let prober = Prober::new(Duration::from_millis(250)).unwrap();
        assert_eq!(prober.timeout(), Duration::from_millis(250));
    }
}
