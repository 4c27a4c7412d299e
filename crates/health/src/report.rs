//! Probe results and the aggregated health report.

use common::ServiceEndpoint;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a single probe.
///
/// ```text
/// 200 within timeout            ──► Online
/// other status within timeout   ──► Degraded
/// timeout / transport failure   ──► Offline
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// The service answered its health endpoint with 200.
    Online,
    /// The service answered, but not with 200.
    Degraded,
    /// No response within the timeout.
    Offline,
}

impl ProbeStatus {
    /// Returns the status name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Online => "online",
            ProbeStatus::Degraded => "degraded",
            ProbeStatus::Offline => "offline",
        }
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one probe against one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    /// The endpoint that was probed.
    pub endpoint: ServiceEndpoint,
    /// Classified status.
    pub status: ProbeStatus,
    /// Round-trip time in milliseconds. Present only if a response arrived.
    pub latency_ms: Option<u64>,
    /// HTTP status code of the response, if one arrived.
    pub status_code: Option<u16>,
    /// Body of a successful health response.
    pub payload: Option<Value>,
    /// Why the endpoint is offline.
    pub error: Option<String>,
}

impl ProbeResult {
    /// A 200 response with its (possibly empty) JSON body.
    pub fn online(endpoint: ServiceEndpoint, latency_ms: u64, payload: Value) -> Self {
        Self {
            endpoint,
            status: ProbeStatus::Online,
            latency_ms: Some(latency_ms),
            status_code: Some(200),
            payload: Some(payload),
            error: None,
        }
    }

    /// A non-200 response.
    pub fn degraded(endpoint: ServiceEndpoint, latency_ms: u64, status_code: u16) -> Self {
        Self {
            endpoint,
            status: ProbeStatus::Degraded,
            latency_ms: Some(latency_ms),
            status_code: Some(status_code),
            payload: None,
            error: None,
        }
    }

    /// No response: timeout, refused connection, DNS failure, reset.
    pub fn offline(endpoint: ServiceEndpoint, error: impl Into<String>) -> Self {
        Self {
            endpoint,
            status: ProbeStatus::Offline,
            latency_ms: None,
            status_code: None,
            payload: None,
            error: Some(error.into()),
        }
    }

    /// Details shown to operators: the health body when online, the error
    /// when offline, nothing when degraded.
    pub fn details(&self) -> Value {
        match (&self.payload, &self.error) {
            (Some(payload), _) => payload.clone(),
            (None, Some(error)) => serde_json::json!({ "error": error }),
            (None, None) => Value::Null,
        }
    }
}

/// Overall classification of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemHealth {
    /// Every service is online.
    Healthy,
    /// At least one service is not online, but not all are offline.
    Degraded,
    /// Every service is offline.
    Down,
}

/// One probe result per configured endpoint, in configuration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct HealthReport {
    results: Vec<ProbeResult>,
}

impl HealthReport {
    /// Wraps results that are already in configuration order.
    pub fn new(results: Vec<ProbeResult>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results.iter()
    }

    pub fn into_results(self) -> Vec<ProbeResult> {
        self.results
    }

    /// Number of entries with the given status.
    pub fn count(&self, status: ProbeStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Classifies the system as a whole.
    pub fn overall(&self) -> SystemHealth {
        if self.count(ProbeStatus::Online) == self.len() {
            SystemHealth::Healthy
        } else if self.count(ProbeStatus::Offline) == self.len() {
            SystemHealth::Down
        } else {
            SystemHealth::Degraded
        }
    }
}
