//! Probe and aggregation tests against real local HTTP servers.

use std::time::{Duration, Instant};

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use common::ServiceEndpoint;
use health::{HealthAggregator, ProbeStatus, Prober, SystemHealth};
use serde_json::json;
use tokio::net::TcpListener;

async fn spawn_service(router: Router) -> ServiceEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    ServiceEndpoint::new(format!("http://{addr}"))
}

async fn healthy_service(name: &'static str) -> ServiceEndpoint {
    spawn_service(Router::new().route(
        "/health",
        get(move || async move { Json(json!({ "status": "healthy", "service": name })) }),
    ))
    .await
}

async fn failing_service() -> ServiceEndpoint {
    spawn_service(Router::new().route(
        "/health",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
    ))
    .await
}

async fn plain_text_service() -> ServiceEndpoint {
    spawn_service(Router::new().route("/health", get(|| async { "ok" }))).await
}

/// Accepts TCP connections but never answers.
async fn silent_service() -> (ServiceEndpoint, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (ServiceEndpoint::new(format!("http://{addr}")), listener)
}

/// A port nothing listens on.
fn unreachable_service() -> ServiceEndpoint {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    ServiceEndpoint::new(format!("http://{addr}"))
}

fn aggregator(timeout: Duration) -> HealthAggregator {
    HealthAggregator::new(timeout).unwrap()
}

#[tokio::test]
async fn test_probe_online_keeps_json_details() {
    let endpoint = healthy_service("orders").await;
    let prober = Prober::new(Duration::from_secs(2)).unwrap();

    let result = prober.probe(&endpoint).await;

    assert_eq!(result.status, ProbeStatus::Online);
    assert!(result.latency_ms.is_some());
    assert_eq!(result.payload, Some(json!({"status": "healthy", "service": "orders"})));
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_probe_online_without_json_has_empty_details() {
    let endpoint = plain_text_service().await;
    let result = health::probe(&endpoint, Duration::from_secs(2)).await;

    assert_eq!(result.status, ProbeStatus::Online);
    assert_eq!(result.payload, Some(json!({})));
}

#[tokio::test]
async fn test_probe_503_is_degraded_not_offline() {
    let endpoint = failing_service().await;
    let result = health::probe(&endpoint, Duration::from_secs(2)).await;

    assert_eq!(result.status, ProbeStatus::Degraded);
    assert_eq!(result.status_code, Some(503));
    assert!(result.latency_ms.is_some());
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_probe_unreachable_is_offline_with_error() {
    let endpoint = unreachable_service();
    let result = health::probe(&endpoint, Duration::from_secs(2)).await;

    assert_eq!(result.status, ProbeStatus::Offline);
    assert_eq!(result.latency_ms, None);
    assert!(!result.error.unwrap().is_empty());
}

#[tokio::test]
async fn test_probe_timeout_is_offline_and_bounded() {
    let (endpoint, _listener) = silent_service().await;
    let timeout = Duration::from_millis(200);

    let started = Instant::now();
    let result = health::probe(&endpoint, timeout).await;
    let elapsed = started.elapsed();

    assert_eq!(result.status, ProbeStatus::Offline);
    assert!(result.error.is_some());
    assert!(elapsed >= timeout);
    assert!(elapsed < Duration::from_millis(1000), "probe took {elapsed:?}");
}

#[tokio::test]
async fn test_all_healthy_report_in_configured_order() {
    let endpoints = vec![
        healthy_service("orders").await,
        healthy_service("payments").await,
        healthy_service("notifications").await,
    ];

    let report = aggregator(Duration::from_secs(2)).aggregate(&endpoints).await;

    assert_eq!(report.len(), 3);
    for (result, endpoint) in report.iter().zip(&endpoints) {
        assert_eq!(&result.endpoint, endpoint);
        assert_eq!(result.status, ProbeStatus::Online);
    }
    assert_eq!(report.results()[1].payload.as_ref().unwrap()["service"], "payments");
    assert_eq!(report.overall(), SystemHealth::Healthy);
}

#[tokio::test]
async fn test_one_unreachable_endpoint_keeps_report_length() {
    let endpoints = vec![
        healthy_service("orders").await,
        unreachable_service(),
        healthy_service("notifications").await,
    ];

    let report = aggregator(Duration::from_secs(2)).aggregate(&endpoints).await;

    assert_eq!(report.len(), 3);
    assert_eq!(report.results()[0].status, ProbeStatus::Online);
    assert_eq!(report.results()[1].status, ProbeStatus::Offline);
    assert_eq!(report.results()[1].endpoint, endpoints[1]);
    assert!(report.results()[1].error.is_some());
    assert_eq!(report.results()[2].status, ProbeStatus::Online);
    assert_eq!(report.overall(), SystemHealth::Degraded);
}

#[tokio::test]
async fn test_aggregation_time_bounded_by_single_timeout() {
    let timeout = Duration::from_millis(300);
    let mut listeners = Vec::new();
    let mut endpoints = Vec::new();
    for _ in 0..5 {
        let (endpoint, listener) = silent_service().await;
        endpoints.push(endpoint);
        listeners.push(listener);
    }

    let started = Instant::now();
    let report = aggregator(timeout).aggregate(&endpoints).await;
    let elapsed = started.elapsed();

    assert_eq!(report.len(), 5);
    assert_eq!(report.count(ProbeStatus::Offline), 5);
    assert_eq!(report.overall(), SystemHealth::Down);
    // Sequential probing would take 5 x 300ms.
    assert!(elapsed < Duration::from_millis(1000), "aggregation took {elapsed:?}");
}

#[tokio::test]
async fn test_slow_probe_does_not_delay_fast_results() {
    let (silent, _listener) = silent_service().await;
    let endpoints = vec![silent, healthy_service("fast").await, failing_service().await];

    let report = aggregator(Duration::from_millis(300)).aggregate(&endpoints).await;

    let statuses: Vec<ProbeStatus> = report.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![ProbeStatus::Offline, ProbeStatus::Online, ProbeStatus::Degraded]
    );
}

#[tokio::test]
async fn test_empty_endpoint_list() {
    let report = aggregator(Duration::from_millis(100)).aggregate(&[]).await;
    assert!(report.is_empty());
}
