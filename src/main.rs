//! traction-feed binary entrypoint.
//! Fetches every source once, writes the snapshot, and optionally keeps
//! serving it (with periodic refresh) over HTTP.

use std::sync::{Arc, RwLock};

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use traction_feed::api::{self, AppState, SharedSnapshot};
use traction_feed::ingest::config::{load_config_default, Credentials};
use traction_feed::ingest::scheduler::{publish, spawn_refresh_scheduler, RefreshSchedulerCfg};
use traction_feed::ingest::{providers::build_http_providers, run_pipeline};
use traction_feed::metrics::Metrics;

/// Compact logs by default; `TRACTION_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("traction_feed=info,warn"));
    let json = std::env::var("TRACTION_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = load_config_default()?;
    let creds = Credentials::from_env();
    info!(credentials = ?creds, output = %cfg.output_path.display(), "starting fetch");
    if creds.reddit_client_id.is_some() {
        info!("reddit credentials present; public listings are used");
    }

    // Recorder must exist before the first counter is touched to be visible.
    let metrics = match cfg.serve.addr {
        Some(_) => Some(Metrics::init(cfg.refresh_interval_secs)?),
        None => None,
    };

    let scorer = cfg.scorer();
    let providers = build_http_providers(&cfg, &creds)?;

    let (doc, report) = run_pipeline(&providers, &cfg, &scorer).await;
    doc.write_to(&cfg.output_path)?;

    info!(
        path = %cfg.output_path.display(),
        items = doc.total_items,
        duplicates = report.duplicates,
        top_score = doc.traction_stats.max_score,
        p90 = doc.traction_stats.p90_score,
        "snapshot written"
    );
    for (source, n) in doc.breakdown() {
        info!(source = %source, items = n, "breakdown");
    }
    if doc.total_items == 0 {
        warn!("no items collected from any source");
    }

    let Some(addr) = cfg.serve.addr.clone() else {
        return Ok(());
    };

    let latest: SharedSnapshot = Arc::new(RwLock::new(None));
    publish(&latest, doc);

    if let Some(secs) = cfg.refresh_interval_secs {
        spawn_refresh_scheduler(
            RefreshSchedulerCfg {
                interval_secs: secs,
                output_path: Some(cfg.output_path.clone()),
            },
            providers,
            cfg.clone(),
            scorer.clone(),
            Arc::clone(&latest),
        );
        info!(interval_secs = secs, "refresh scheduler started");
    }

    let mut router = api::create_router(AppState::new(latest));
    if let Some(m) = &metrics {
        router = router.merge(m.router());
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "serving snapshot");
    axum::serve(listener, router).await.context("http server")?;
    Ok(())
}
