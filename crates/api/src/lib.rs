//! HTTP services with observability.
//!
//! Two applications share this crate:
//! - the gateway: aggregated backend health, event publishing, broker
//!   check and pass-through routes
//! - the orders service: order creation with best-effort payment and
//!   notification side effects
//!
//! Both carry structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod store;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use common::ServiceEndpoint;
use event_bus::EventBus;
use health::HealthAggregator;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{NotificationService, PaymentService};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::OrdersState;
use routes::proxy::Upstreams;
use store::OrderStore;

/// Shared state of the gateway.
pub struct GatewayState {
    /// Services probed by `/api/health`, in report order.
    pub services: Vec<ServiceEndpoint>,
    pub aggregator: HealthAggregator,
    pub bus: Arc<dyn EventBus>,
    pub events_exchange: String,
    /// Client for pass-through calls.
    pub client: reqwest::Client,
    pub upstreams: Upstreams,
}

fn with_common_layers(router: Router, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    router
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the gateway router.
pub fn create_gateway_app(state: Arc<GatewayState>, metrics_handle: PrometheusHandle) -> Router {
    let router = Router::new()
        .route("/health", get(|| routes::health::check("gateway")))
        .route("/api/health", get(routes::services::get))
        .route("/api/events/publish", post(routes::events::publish))
        .route("/api/rabbit", get(routes::events::broker))
        .route(
            "/api/orders",
            get(routes::proxy::list_orders).post(routes::proxy::create_order),
        )
        .route("/api/payments", get(routes::proxy::list_payments))
        .route("/api/notifications", get(routes::proxy::list_notifications))
        .route("/api/logs", get(routes::proxy::list_logs))
        .route("/api/metrics/summary", get(routes::proxy::metrics_summary))
        .route("/api/dashboard", get(routes::proxy::dashboard))
        .with_state(state);

    with_common_layers(router, metrics_handle)
}

/// Creates the orders service router.
pub fn create_orders_app<S, P, N>(
    state: Arc<OrdersState<S, P, N>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    S: OrderStore + 'static,
    P: PaymentService + 'static,
    N: NotificationService + 'static,
{
    let router = Router::new()
        .route("/health", get(|| routes::health::check("orders")))
        .route(
            "/orders",
            post(routes::orders::create::<S, P, N>).get(routes::orders::list::<S, P, N>),
        )
        .with_state(state);

    with_common_layers(router, metrics_handle)
}
