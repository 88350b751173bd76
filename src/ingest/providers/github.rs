// src/ingest/providers/github.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use metrics::counter;
use serde::Deserialize;
use std::time::Duration;

use super::{get_text, polite_pause, skip_sub_request};
use crate::dates::RawTimestamp;
use crate::ingest::config::{GitHubConfig, MAX_WINDOW_DAYS};
use crate::ingest::types::{RawRecord, SourceProvider};
use crate::item::{GitHubMeta, SourceMeta};
use crate::source::Source;

const SEARCH_URL: &str = "https://api.github.com/search/repositories";
const MAX_TOPICS: usize = 5;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Repo>,
}

#[derive(Debug, Deserialize)]
struct Repo {
    #[serde(default)]
    full_name: String,
    description: Option<String>,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    created_at: Option<String>,
    language: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    owner: Option<Owner>,
}

#[derive(Debug, Deserialize)]
struct Owner {
    #[serde(default)]
    login: String,
}

fn parse_search(s: &str) -> Result<Vec<RawRecord>> {
    let resp: SearchResponse = serde_json::from_str(s).context("parsing github search json")?;
    Ok(resp.items.into_iter().map(record_from_repo).collect())
}

fn record_from_repo(r: Repo) -> RawRecord {
    let description = r.description.unwrap_or_default();
    let title = format!(
        "{} — {}",
        r.full_name,
        if description.trim().is_empty() {
            "No description"
        } else {
            description.as_str()
        }
    );
    RawRecord {
        native_key: r.full_name.clone(),
        item_type: "repo".to_string(),
        title,
        body: Some(description),
        url: r.html_url,
        author: r.owner.map(|o| o.login).unwrap_or_default(),
        published: r.created_at.map(RawTimestamp::Text),
        engagement: r.stargazers_count as f64,
        discussion: r.forks_count as f64,
        meta: SourceMeta::GitHub(GitHubMeta {
            stars: r.stargazers_count,
            forks: r.forks_count,
            language: r.language.unwrap_or_default(),
            topics: r.topics.into_iter().take(MAX_TOPICS).collect(),
            full_name: r.full_name,
        }),
    }
}

/// Search query for repos created inside the window, optionally per language.
pub(crate) fn search_query(cfg: &GitHubConfig, language: &str, today: chrono::NaiveDate) -> String {
    let since = today - ChronoDuration::days(cfg.window_days.clamp(1, MAX_WINDOW_DAYS));
    let mut q = format!("created:>{} stars:>{}", since.format("%Y-%m-%d"), cfg.min_stars);
    if !language.is_empty() {
        q.push_str(&format!(" language:{language}"));
    }
    q
}

pub struct GitHubProvider {
    mode: Mode,
}

enum Mode {
    /// Search API response bodies.
    Fixture(Vec<String>),
    Http {
        client: reqwest::Client,
        cfg: GitHubConfig,
        token: Option<String>,
        delay: Duration,
    },
}

impl GitHubProvider {
    pub fn from_fixture(search_json: &str) -> Self {
        Self {
            mode: Mode::Fixture(vec![search_json.to_string()]),
        }
    }

    pub fn from_http(
        client: reqwest::Client,
        cfg: GitHubConfig,
        token: Option<String>,
        delay: Duration,
    ) -> Self {
        Self {
            mode: Mode::Http {
                client,
                cfg,
                token,
                delay,
            },
        }
    }
}

#[async_trait]
impl SourceProvider for GitHubProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawRecord>> {
        let mut out = Vec::new();
        match &self.mode {
            Mode::Fixture(bodies) => {
                for body in bodies {
                    out.extend(parse_search(body)?);
                }
            }
            Mode::Http {
                client,
                cfg,
                token,
                delay,
            } => {
                let today = Utc::now().date_naive();
                for lang in &cfg.languages {
                    let q = search_query(cfg, lang, today);
                    let label = if lang.is_empty() { "all" } else { lang.as_str() };
                    tracing::debug!(target: "ingest", language = label, "github trending");

                    let per_page = cfg.per_page.to_string();
                    let mut req = client
                        .get(SEARCH_URL)
                        .header("Accept", "application/vnd.github+json")
                        .query(&[
                            ("q", q.as_str()),
                            ("sort", "stars"),
                            ("order", "desc"),
                            ("per_page", per_page.as_str()),
                        ]);
                    if let Some(t) = token {
                        req = req.bearer_auth(t);
                    }

                    match get_text(req, "github search").await.and_then(|b| parse_search(&b)) {
                        Ok(mut v) => out.append(&mut v),
                        Err(e) => skip_sub_request("GitHub", label, &e),
                    }
                    polite_pause(*delay).await;
                }
            }
        }
        counter!("ingest_records_total", "source" => "github").increment(out.len() as u64);
        Ok(out)
    }

    fn source(&self) -> Source {
        Source::GitHub
    }

    fn name(&self) -> &'static str {
        "GitHub"
    }
}
