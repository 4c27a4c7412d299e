//! Aggregated health of the backend services.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use health::{HealthReport, ProbeResult, ProbeStatus, SystemHealth};
use serde::Serialize;
use serde_json::Value;

use crate::GatewayState;

/// One backend service in the aggregated report.
#[derive(Debug, Serialize)]
pub struct ServiceHealthEntry {
    /// The service base URL.
    pub name: String,
    pub status: ProbeStatus,
    pub latency_ms: Option<u64>,
    pub details: Value,
}

impl From<ProbeResult> for ServiceHealthEntry {
    fn from(result: ProbeResult) -> Self {
        let details = result.details();
        Self {
            name: result.endpoint.to_string(),
            status: result.status,
            latency_ms: result.latency_ms,
            details,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServicesHealthResponse {
    /// Entries in configured order.
    pub services: Vec<ServiceHealthEntry>,
    pub overall: SystemHealth,
}

impl From<HealthReport> for ServicesHealthResponse {
    fn from(report: HealthReport) -> Self {
        let overall = report.overall();
        Self {
            services: report.into_results().into_iter().map(Into::into).collect(),
            overall,
        }
    }
}

/// GET /api/health: probes every configured service concurrently.
///
/// Always answers 200; dead services show up as `offline` entries.
#[tracing::instrument(skip(state))]
pub async fn get(State(state): State<Arc<GatewayState>>) -> Json<ServicesHealthResponse> {
    let report = state.aggregator.aggregate(&state.services).await;
    Json(report.into())
}
