// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod scheduler;
pub mod types;

use crate::ingest::config::FetcherConfig;
use crate::ingest::types::{SourceBatch, SourceProvider};
use crate::pipeline::{run_core, RunReport};
use crate::scoring::TractionScorer;
use crate::snapshot::SnapshotDocument;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_records_total", "Raw records returned by providers.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider failures, timeouts and skipped sub-requests."
        );
        describe_counter!(
            "ingest_dedup_total",
            "Items removed by url/id deduplication."
        );
        describe_counter!("ingest_runs_total", "Completed pipeline runs.");
        describe_histogram!("ingest_fetch_ms", "Upstream request time in milliseconds.");
        describe_histogram!("ingest_provider_ms", "Whole-provider fetch time in milliseconds.");
        describe_gauge!("pipeline_items_total", "Items in the latest snapshot.");
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when the pipeline last produced a snapshot."
        );
    });
}

/// Fan out to every provider, at most `concurrency` at a time, each bounded
/// by `timeout`. A provider that errors, times out or panics contributes an
/// empty batch. Batches come back in canonical source order.
pub async fn run_once(
    providers: &[Arc<dyn SourceProvider>],
    concurrency: usize,
    timeout: Duration,
) -> Vec<SourceBatch> {
    ensure_metrics_described();

    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();

    for p in providers {
        let p = Arc::clone(p);
        let permits = Arc::clone(&permits);
        set.spawn(async move {
            // closed only if the semaphore is dropped, which it is not here
            let _permit = permits.acquire_owned().await.ok();
            let t0 = Instant::now();
            let outcome = tokio::time::timeout(timeout, p.fetch_latest()).await;
            histogram!("ingest_provider_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

            let records = match outcome {
                Ok(Ok(v)) => {
                    tracing::info!(target: "ingest", provider = p.name(), records = v.len(), "provider done");
                    v
                }
                Ok(Err(e)) => {
                    tracing::warn!(target: "ingest", error = ?e, provider = p.name(), "provider error");
                    counter!("ingest_provider_errors_total").increment(1);
                    Vec::new()
                }
                Err(_) => {
                    tracing::warn!(
                        target: "ingest",
                        provider = p.name(),
                        timeout_secs = timeout.as_secs(),
                        "provider timed out"
                    );
                    counter!("ingest_provider_errors_total").increment(1);
                    Vec::new()
                }
            };
            SourceBatch {
                source: p.source(),
                records,
            }
        });
    }

    let mut batches = Vec::with_capacity(providers.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(batch) => batches.push(batch),
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, "provider task panicked");
                counter!("ingest_provider_errors_total").increment(1);
            }
        }
    }

    batches.sort_by_key(|b| b.source.priority());
    batches
}

/// Fetch everything, then run the deterministic core. Never fails: a run in
/// which every provider failed yields an empty snapshot.
pub async fn run_pipeline(
    providers: &[Arc<dyn SourceProvider>],
    cfg: &FetcherConfig,
    scorer: &TractionScorer,
) -> (SnapshotDocument, RunReport) {
    let batches = run_once(
        providers,
        cfg.concurrency,
        Duration::from_secs(cfg.provider_timeout_secs),
    )
    .await;

    let now = chrono::Utc::now();
    let (doc, report) = run_core(batches, scorer, now, cfg.pipeline_settings());

    counter!("ingest_dedup_total").increment(report.duplicates as u64);
    counter!("ingest_runs_total").increment(1);
    gauge!("pipeline_items_total").set(doc.total_items as f64);
    gauge!("pipeline_last_run_ts").set(now.timestamp().max(0) as f64);

    tracing::info!(
        target: "ingest",
        raw = report.raw_records,
        duplicates = report.duplicates,
        truncated = report.truncated,
        kept = report.kept,
        "pipeline run complete"
    );

    (doc, report)
}
