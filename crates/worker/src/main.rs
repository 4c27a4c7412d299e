//! Saga worker entry point.
//!
//! Binds the durable events queue to the fan-out exchange and consumes it
//! until SIGINT or SIGTERM. The broker must be reachable at startup; after
//! that, dropped connections are re-established in the background. Metrics
//! are served on `METRICS_ADDR` for Prometheus to scrape.

mod config;

use common::telemetry::{init_tracing, serve_metrics, shutdown_signal};
use event_bus::{EventBusExt, QueueOptions, RabbitMqEventBus};
use saga::{HttpPaymentService, SagaWorker};

use crate::config::Config;

#[tokio::main]
async fn main() {
    // 1. Initialize tracing and load configuration
    init_tracing();
    let config = Config::from_env();

    // 2. Serve metrics
    serve_metrics(config.metrics_addr).expect("failed to start Prometheus listener");

    let broker = config.broker();
    tracing::info!(
        url = %broker.url_redacted(),
        exchange = %config.events_exchange,
        queue = %config.events_queue,
        payments = %config.payments_url,
        "worker configured"
    );

    // 3. Connect and declare topology
    let bus = RabbitMqEventBus::connect(broker)
        .await
        .expect("failed to connect to broker");
    bus.declare_bound_queue(
        &config.events_exchange,
        &config.events_queue,
        QueueOptions::durable(),
    )
    .await
    .expect("failed to declare events queue");

    // 4. Consume until shutdown
    let payments = HttpPaymentService::new(config.payments_url.clone(), config.downstream_timeout)
        .expect("failed to build payment client");
    let worker = SagaWorker::new(bus.clone(), payments, config.events_queue.clone());

    let outcome = worker.run_until(shutdown_signal()).await;

    if let Err(err) = bus.close().await {
        tracing::warn!(error = %err, "failed to close broker connection");
    }

    match outcome {
        Ok(summary) => tracing::info!(processed = summary.total(), "worker finished"),
        Err(err) => {
            tracing::error!(error = %err, "worker failed");
            std::process::exit(1);
        }
    }
}
