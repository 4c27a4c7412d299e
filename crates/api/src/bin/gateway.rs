//! Gateway entry point.

use std::sync::Arc;

use api::GatewayState;
use api::config::GatewayConfig;
use api::routes::proxy::Upstreams;
use common::telemetry::{init_tracing, install_metrics, shutdown_signal};
use event_bus::{RabbitMqConfig, RabbitMqEventBus};
use health::HealthAggregator;

#[tokio::main]
async fn main() {
    // 1. Initialize tracing and metrics
    init_tracing();
    let metrics_handle = install_metrics().expect("failed to install Prometheus recorder");

    // 2. Load configuration
    let config = GatewayConfig::from_env();
    tracing::info!(
        services = config.services.len(),
        probe_timeout_ms = config.probe_timeout.as_millis() as u64,
        "gateway configured"
    );

    // 3. Build shared state. The broker connection is opened on first use so
    //    the gateway serves health checks while the broker is down.
    let aggregator =
        HealthAggregator::new(config.probe_timeout).expect("failed to build probe client");
    let bus = RabbitMqEventBus::lazy(
        RabbitMqConfig::new(config.rabbitmq_url.clone()).with_connection_name("gateway"),
    );
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client");

    let state = Arc::new(GatewayState {
        services: config.services.clone(),
        aggregator,
        bus: Arc::new(bus.clone()),
        events_exchange: config.events_exchange.clone(),
        client,
        upstreams: Upstreams {
            orders: config.orders_url.clone(),
            payments: config.payments_url.clone(),
            notifications: config.notifications_url.clone(),
            logs: config.logs_url.clone(),
            metrics: config.metrics_url.clone(),
        },
    });

    // 4. Start server
    let app = api::create_gateway_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting gateway");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    if let Err(err) = bus.close().await {
        tracing::warn!(error = %err, "failed to close broker connection");
    }
    tracing::info!("gateway shut down gracefully");
}
