// src/ingest/providers/hackernews.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use super::{get_json, polite_pause, skip_sub_request};
use crate::dates::RawTimestamp;
use crate::ingest::config::HackerNewsConfig;
use crate::ingest::types::{RawRecord, SourceProvider};
use crate::item::{HackerNewsMeta, SourceMeta};
use crate::source::Source;

const API_BASE: &str = "https://hacker-news.firebaseio.com/v0";
const ITEM_DELAY: Duration = Duration::from_millis(50);
const KEPT_TYPES: [&str; 3] = ["story", "ask", "show"];

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HnItem {
    id: u64,
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    url: Option<String>,
    score: Option<i64>,
    descendants: Option<i64>,
    by: Option<String>,
    time: Option<i64>,
    text: Option<String>,
    #[serde(default)]
    dead: bool,
    #[serde(default)]
    deleted: bool,
}

/// `None` for comments, jobs, polls and dead/deleted entries.
pub(crate) fn record_from_item(it: HnItem) -> Option<RawRecord> {
    let kind = it.kind.unwrap_or_else(|| "story".to_string());
    if it.dead || it.deleted || !KEPT_TYPES.contains(&kind.as_str()) {
        return None;
    }
    let points = it.score.unwrap_or(0).max(0) as u64;
    let comments = it.descendants.unwrap_or(0).max(0) as u64;
    let url = it
        .url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", it.id));

    Some(RawRecord {
        native_key: it.id.to_string(),
        item_type: "story".to_string(),
        title: it.title.unwrap_or_default(),
        body: it.text,
        url,
        author: it.by.unwrap_or_default(),
        published: it.time.map(RawTimestamp::Unix),
        engagement: points as f64,
        discussion: comments as f64,
        meta: SourceMeta::HackerNews(HackerNewsMeta {
            hn_id: it.id,
            points,
            num_comments: comments,
            story_type: kind,
        }),
    })
}

pub struct HackerNewsProvider {
    mode: Mode,
}

enum Mode {
    /// JSON array of item objects.
    Fixture(String),
    Http {
        client: reqwest::Client,
        cfg: HackerNewsConfig,
        max_items: usize,
        delay: Duration,
    },
}

impl HackerNewsProvider {
    pub fn from_fixture(json: &str) -> Self {
        Self {
            mode: Mode::Fixture(json.to_string()),
        }
    }

    /// `max_items_per_source`: the crawl stops between lists once
    /// twice this many stories have been collected.
    pub fn from_http(
        client: reqwest::Client,
        cfg: HackerNewsConfig,
        max_items_per_source: usize,
        delay: Duration,
    ) -> Self {
        Self {
            mode: Mode::Http {
                client,
                cfg,
                max_items: max_items_per_source * 2,
                delay,
            },
        }
    }

    fn parse_items_from_str(s: &str) -> Result<Vec<RawRecord>> {
        let items: Vec<Option<HnItem>> = serde_json::from_str(s).context("parsing hn items json")?;
        let out: Vec<RawRecord> = items.into_iter().flatten().filter_map(record_from_item).collect();
        counter!("ingest_records_total", "source" => "hackernews").increment(out.len() as u64);
        Ok(out)
    }

    async fn crawl(
        client: &reqwest::Client,
        cfg: &HackerNewsConfig,
        max_items: usize,
        delay: Duration,
    ) -> Result<Vec<RawRecord>> {
        let mut out = Vec::new();
        let mut seen: HashSet<u64> = HashSet::new();

        for list in &cfg.story_types {
            let ids: Vec<u64> = match get_json(
                client.get(format!("{API_BASE}/{list}.json")),
                "hn story list",
            )
            .await
            {
                Ok(v) => v,
                Err(e) => {
                    skip_sub_request("HackerNews", list, &e);
                    continue;
                }
            };

            for id in ids.into_iter().take(cfg.top_n) {
                if !seen.insert(id) {
                    continue;
                }
                let item: Option<HnItem> =
                    match get_json(client.get(format!("{API_BASE}/item/{id}.json")), "hn item").await {
                        Ok(v) => v,
                        Err(e) => {
                            skip_sub_request("HackerNews", "item", &e);
                            continue;
                        }
                    };
                if let Some(rec) = item.and_then(record_from_item) {
                    out.push(rec);
                }
                polite_pause(ITEM_DELAY).await;
            }

            if out.len() >= max_items {
                break;
            }
            polite_pause(delay).await;
        }

        counter!("ingest_records_total", "source" => "hackernews").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for HackerNewsProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawRecord>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s),
            Mode::Http {
                client,
                cfg,
                max_items,
                delay,
            } => Self::crawl(client, cfg, *max_items, *delay).await,
        }
    }

    fn source(&self) -> Source {
        Source::HackerNews
    }

    fn name(&self) -> &'static str {
        "HackerNews"
    }
}
