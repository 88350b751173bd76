//! Prometheus exposition for the fetcher.
//!
//! Counters and per-run gauges are emitted from `ingest`; this module owns the
//! recorder and the configured refresh cadence.

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Gauge holding the scheduler period in seconds, 0 for one-shot runs.
pub const REFRESH_INTERVAL_GAUGE: &str = "pipeline_refresh_interval_secs";

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide recorder, describe the ingest series and
    /// publish the refresh cadence.
    pub fn init(refresh_interval_secs: Option<u64>) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        crate::ingest::ensure_metrics_described();
        gauge!(REFRESH_INTERVAL_GAUGE).set(refresh_interval_secs.unwrap_or(0) as f64);

        Ok(Self { handle })
    }

    /// `GET /metrics`, merged into the snapshot router when serving.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
