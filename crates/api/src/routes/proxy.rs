//! Pass-through routes from the gateway to backend services.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use common::ServiceEndpoint;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::GatewayState;
use crate::error::ApiError;

/// Base URLs the gateway forwards to.
#[derive(Debug, Clone)]
pub struct Upstreams {
    pub orders: ServiceEndpoint,
    pub payments: ServiceEndpoint,
    pub notifications: ServiceEndpoint,
    pub logs: ServiceEndpoint,
    pub metrics: ServiceEndpoint,
}

type Relayed = Result<(StatusCode, Json<Value>), ApiError>;

/// Sends the request and relays the upstream status and JSON body.
async fn forward(request: reqwest::RequestBuilder, url: &str) -> Relayed {
    let response = request
        .send()
        .await
        .map_err(|e| ApiError::BadGateway(format!("{url} unreachable: {e}")))?;

    let status = StatusCode::from_u16(response.status().as_u16())
        .map_err(|e| ApiError::BadGateway(e.to_string()))?;
    let body: Value = response
        .json()
        .await
        .map_err(|e| ApiError::BadGateway(format!("{url} sent an invalid body: {e}")))?;

    tracing::debug!(url, status = status.as_u16(), "relayed upstream response");
    Ok((status, Json(body)))
}

async fn get_from(state: &GatewayState, endpoint: &ServiceEndpoint, path: &str) -> Relayed {
    let url = endpoint.join(path);
    forward(state.client.get(&url), &url).await
}

/// GET /api/orders
#[tracing::instrument(skip(state))]
pub async fn list_orders(State(state): State<Arc<GatewayState>>) -> Relayed {
    get_from(&state, &state.upstreams.orders, "/orders").await
}

/// POST /api/orders
#[tracing::instrument(skip(state, body))]
pub async fn create_order(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<Value>,
) -> Relayed {
    let url = state.upstreams.orders.join("/orders");
    forward(state.client.post(&url).json(&body), &url).await
}

/// GET /api/payments
#[tracing::instrument(skip(state))]
pub async fn list_payments(State(state): State<Arc<GatewayState>>) -> Relayed {
    get_from(&state, &state.upstreams.payments, "/payments").await
}

/// GET /api/notifications
#[tracing::instrument(skip(state))]
pub async fn list_notifications(State(state): State<Arc<GatewayState>>) -> Relayed {
    get_from(&state, &state.upstreams.notifications, "/notifications").await
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default = "all_services")]
    pub service: String,
}

fn all_services() -> String {
    "all".to_string()
}

/// GET /api/logs?service=
#[tracing::instrument(skip(state))]
pub async fn list_logs(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<LogsQuery>,
) -> Relayed {
    let url = state.upstreams.logs.join("/logs");
    let request = state.client.get(&url).query(&[("service", &query.service)]);
    forward(request, &url).await
}

/// GET /api/metrics/summary
#[tracing::instrument(skip(state))]
pub async fn metrics_summary(State(state): State<Arc<GatewayState>>) -> Relayed {
    get_from(&state, &state.upstreams.metrics, "/summary").await
}

const DASHBOARD_TIMEOUT: Duration = Duration::from_secs(5);

/// GET /api/dashboard
///
/// Collects `GET {service}/dashboard` from every probed service, keyed by
/// base URL. A service that fails or sends a non-JSON body is reported as
/// `{"error": "unreachable"}`.
#[tracing::instrument(skip(state))]
pub async fn dashboard(State(state): State<Arc<GatewayState>>) -> Json<Map<String, Value>> {
    let fetches = state.services.iter().map(|service| {
        let url = service.join("/dashboard");
        let request = state.client.get(&url).timeout(DASHBOARD_TIMEOUT);
        async move {
            let body = match request.send().await {
                Ok(response) => response.json::<Value>().await.ok(),
                Err(err) => {
                    tracing::debug!(%url, error = %err, "dashboard fetch failed");
                    None
                }
            };
            body.unwrap_or_else(|| json!({ "error": "unreachable" }))
        }
    });

    let bodies = futures_util::future::join_all(fetches).await;
    let aggregated = state
        .services
        .iter()
        .map(|service| service.as_str().to_string())
        .zip(bodies)
        .collect();
    Json(aggregated)
}
