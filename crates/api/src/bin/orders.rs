//! Orders service entry point.

use std::sync::Arc;

use api::config::OrdersConfig;
use api::routes::orders::OrdersState;
use api::store::InMemoryOrderStore;
use common::telemetry::{init_tracing, install_metrics, shutdown_signal};
use saga::{HttpNotificationService, HttpPaymentService, OrderOrchestrator};

#[tokio::main]
async fn main() {
    // 1. Initialize tracing and metrics
    init_tracing();
    let metrics_handle = install_metrics().expect("failed to install Prometheus recorder");

    // 2. Load configuration
    let config = OrdersConfig::from_env();
    tracing::info!(
        payments = %config.payments_url,
        notifications = %config.notifications_url,
        mode = ?config.side_effects_mode,
        "orders service configured"
    );

    // 3. Wire the store and side-effect clients
    let payments = HttpPaymentService::new(config.payments_url.clone(), config.side_effect_timeout)
        .expect("failed to build payment client");
    let notifications =
        HttpNotificationService::new(config.notifications_url.clone(), config.side_effect_timeout)
            .expect("failed to build notification client");

    let state = Arc::new(OrdersState {
        store: InMemoryOrderStore::new(),
        orchestrator: OrderOrchestrator::new(payments, notifications)
            .with_timeout(config.side_effect_timeout),
        side_effects: config.side_effects_mode,
    });

    // 4. Start server
    let app = api::create_orders_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting orders service");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("orders service shut down gracefully");
}
