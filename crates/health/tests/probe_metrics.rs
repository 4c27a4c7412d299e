//! Metrics recorded by a probe, rendered through the Prometheus recorder.

use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::routing::get;
use common::ServiceEndpoint;
use health::{ProbeStatus, Prober};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::json;
use tokio::net::TcpListener;

#[tokio::test]
async fn test_probe_records_status_and_latency() {
    let handle = PrometheusBuilder::new().install_recorder().unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = Router::new().route("/health", get(|| async { Json(json!({"status": "healthy"})) }));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let prober = Prober::new(Duration::from_secs(2)).unwrap();
    let result = prober
        .probe(&ServiceEndpoint::new(format!("http://{addr}")))
        .await;
    assert_eq!(result.status, ProbeStatus::Online);

    let rendered = handle.render();
    assert!(rendered.contains(r#"health_probes_total{status="online"} 1"#));
    assert!(rendered.contains("health_probe_latency_seconds_count 1"));
}
