// src/ingest/providers/mod.rs
//! Source adapters. Each one turns a third-party response into `RawRecord`s;
//! none of them score or deduplicate across sources.

pub mod github;
pub mod hackernews;
pub mod reddit;
pub mod rss;
pub mod youtube;

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::ingest::config::{Credentials, FetcherConfig};
use crate::ingest::types::SourceProvider;

pub const USER_AGENT: &str = "traction-feed/0.1 (tech trending aggregator)";
const HTTP_TIMEOUT_SECS: u64 = 10;

/// Shared client: per-request timeout and a descriptive user agent.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .context("building http client")
}

/// GET + status check + JSON decode, timed into `ingest_fetch_ms`.
pub(crate) async fn get_json<T: DeserializeOwned>(req: reqwest::RequestBuilder, what: &str) -> Result<T> {
    let t0 = std::time::Instant::now();
    let resp = req
        .send()
        .await
        .with_context(|| format!("{what}: send"))?
        .error_for_status()
        .with_context(|| format!("{what}: status"))?;
    let out = resp
        .json::<T>()
        .await
        .with_context(|| format!("{what}: decode json"))?;
    histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(out)
}

/// GET + status check, raw body.
pub(crate) async fn get_text(req: reqwest::RequestBuilder, what: &str) -> Result<String> {
    let t0 = std::time::Instant::now();
    let body = req
        .send()
        .await
        .with_context(|| format!("{what}: send"))?
        .error_for_status()
        .with_context(|| format!("{what}: status"))?
        .text()
        .await
        .with_context(|| format!("{what}: body"))?;
    histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(body)
}

/// A failed sub-request inside a provider: log, count, move on.
pub(crate) fn skip_sub_request(provider: &'static str, what: &str, err: &anyhow::Error) {
    tracing::warn!(target: "ingest", provider, what, error = ?err, "sub-request failed, skipping");
    counter!("ingest_provider_errors_total").increment(1);
}

pub(crate) async fn polite_pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Live providers in canonical source order.
pub fn build_http_providers(
    cfg: &FetcherConfig,
    creds: &Credentials,
) -> Result<Vec<Arc<dyn SourceProvider>>> {
    let client = http_client()?;
    let delay = Duration::from_millis(cfg.request_delay_ms);
    Ok(vec![
        Arc::new(hackernews::HackerNewsProvider::from_http(
            client.clone(),
            cfg.hackernews.clone(),
            cfg.max_items_per_source,
            delay,
        )),
        Arc::new(reddit::RedditProvider::from_http(
            client.clone(),
            cfg.reddit.clone(),
            delay,
        )),
        Arc::new(github::GitHubProvider::from_http(
            client.clone(),
            cfg.github.clone(),
            creds.github_token.clone(),
            delay,
        )),
        Arc::new(youtube::YouTubeProvider::from_http(
            client.clone(),
            cfg.youtube.clone(),
            creds.youtube_api_key.clone(),
            delay,
        )),
        Arc::new(rss::RssProvider::from_http(client, cfg.rss.clone())),
    ])
}
