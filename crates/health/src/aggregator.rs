//! Concurrent fan-out of health probes.

use std::time::{Duration, Instant};

use common::ServiceEndpoint;
use futures_util::future::join_all;

use crate::error::Result;
use crate::probe::Prober;
use crate::report::{HealthReport, ProbeResult};

/// Probes every configured endpoint in parallel and collects the results.
///
/// Each probe runs as its own task with its own deadline, so a round takes
/// roughly one probe timeout no matter how many endpoints are down. There
/// is no retry within a round.
#[derive(Debug, Clone)]
pub struct HealthAggregator {
    prober: Prober,
}

impl HealthAggregator {
    /// Creates an aggregator whose probes each time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            prober: Prober::new(timeout)?,
        })
    }

    /// Creates an aggregator around an existing prober.
    pub fn with_prober(prober: Prober) -> Self {
        Self { prober }
    }

    /// Returns the prober used for each endpoint.
    pub fn prober(&self) -> &Prober {
        &self.prober
    }

    /// Runs one aggregation round.
    ///
    /// Waits for every probe to finish. The report has exactly one entry per
    /// endpoint, in the order given, regardless of completion order.
    #[tracing::instrument(skip_all, fields(endpoints = endpoints.len()))]
    pub async fn aggregate(&self, endpoints: &[ServiceEndpoint]) -> HealthReport {
        let started = Instant::now();

        let handles: Vec<_> = endpoints
            .iter()
            .cloned()
            .map(|endpoint| {
                let prober = self.prober.clone();
                tokio::spawn(async move { prober.probe(&endpoint).await })
            })
            .collect();

        // join_all yields in spawn order, so slot i belongs to endpoint i.
        let results: Vec<ProbeResult> = endpoints
            .iter()
            .zip(join_all(handles).await)
            .map(|(endpoint, joined)| {
                joined.unwrap_or_else(|err| {
                    ProbeResult::offline(endpoint.clone(), format!("probe task failed: {err}"))
                })
            })
            .collect();

        let report = HealthReport::new(results);

        metrics::histogram!("health_aggregation_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(
            overall = ?report.overall(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "health aggregation complete"
        );

        report
    }
}

/// Runs one aggregation round with a freshly built prober.
pub async fn aggregate(endpoints: &[ServiceEndpoint], timeout: Duration) -> HealthReport {
    match HealthAggregator::new(timeout) {
        Ok(aggregator) => aggregator.aggregate(endpoints).await,
        Err(err) => HealthReport::new(
            endpoints
                .iter()
                .map(|endpoint| ProbeResult::offline(endpoint.clone(), err.to_string()))
                .collect(),
        ),
    }
}
