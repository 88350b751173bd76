// src/ingest/providers/reddit.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;
use std::time::Duration;

use super::{get_text, polite_pause, skip_sub_request};
use crate::dates::RawTimestamp;
use crate::ingest::config::RedditConfig;
use crate::ingest::types::{RawRecord, SourceProvider};
use crate::item::{RedditMeta, SourceMeta};
use crate::source::Source;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: Option<String>,
    #[serde(default)]
    title: String,
    url: Option<String>,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    created_utc: Option<f64>,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    stickied: bool,
    #[serde(default)]
    thumbnail: String,
    link_flair_text: Option<String>,
    subreddit: Option<String>,
}

/// Parse one `hot.json` listing. Stickied posts are skipped.
fn parse_listing(s: &str, subreddit: &str) -> Result<Vec<RawRecord>> {
    let listing: Listing = serde_json::from_str(s).context("parsing reddit listing json")?;
    let mut out = Vec::with_capacity(listing.data.children.len());
    for Child { data: p } in listing.data.children {
        if p.stickied {
            continue;
        }
        let url = p
            .url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| format!("https://reddit.com{}", p.permalink));
        let native_key = p.id.clone().unwrap_or_else(|| url.clone());
        let thumbnail = if p.thumbnail.starts_with("http") {
            p.thumbnail
        } else {
            String::new()
        };
        let score = p.score.max(0);
        let comments = p.num_comments.max(0) as u64;

        out.push(RawRecord {
            native_key,
            item_type: "post".to_string(),
            title: p.title,
            body: Some(p.selftext),
            url,
            author: p.author,
            published: p
                .created_utc
                .filter(|t| t.is_finite())
                .map(|t| RawTimestamp::Unix(t as i64)),
            engagement: score as f64,
            discussion: comments as f64,
            meta: SourceMeta::Reddit(RedditMeta {
                subreddit: p.subreddit.unwrap_or_else(|| subreddit.to_string()),
                score: p.score,
                num_comments: comments,
                thumbnail,
                flair: p.link_flair_text.unwrap_or_default(),
            }),
        });
    }
    Ok(out)
}

pub struct RedditProvider {
    mode: Mode,
}

enum Mode {
    /// (subreddit, listing json)
    Fixture(Vec<(String, String)>),
    Http {
        client: reqwest::Client,
        cfg: RedditConfig,
        delay: Duration,
    },
}

impl RedditProvider {
    pub fn from_fixture(subreddit: &str, listing_json: &str) -> Self {
        Self::from_fixtures(vec![(subreddit.to_string(), listing_json.to_string())])
    }

    pub fn from_fixtures(listings: Vec<(String, String)>) -> Self {
        Self {
            mode: Mode::Fixture(listings),
        }
    }

    pub fn from_http(client: reqwest::Client, cfg: RedditConfig, delay: Duration) -> Self {
        Self {
            mode: Mode::Http { client, cfg, delay },
        }
    }
}

#[async_trait]
impl SourceProvider for RedditProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawRecord>> {
        let mut out = Vec::new();
        match &self.mode {
            Mode::Fixture(listings) => {
                for (sub, body) in listings {
                    match parse_listing(body, sub) {
                        Ok(mut v) => out.append(&mut v),
                        Err(e) => skip_sub_request("Reddit", sub, &e),
                    }
                }
            }
            Mode::Http { client, cfg, delay } => {
                for sub in &cfg.subreddits {
                    tracing::debug!(target: "ingest", subreddit = %sub, "fetching r/{sub}");
                    let req = client
                        .get(format!("https://www.reddit.com/r/{sub}/hot.json"))
                        .query(&[("limit", cfg.limit)]);
                    let parsed = get_text(req, "reddit listing")
                        .await
                        .and_then(|body| parse_listing(&body, sub));
                    match parsed {
                        Ok(mut v) => out.append(&mut v),
                        Err(e) => skip_sub_request("Reddit", sub, &e),
                    }
                    polite_pause(*delay).await;
                }
            }
        }
        counter!("ingest_records_total", "source" => "reddit").increment(out.len() as u64);
        Ok(out)
    }

    fn source(&self) -> Source {
        Source::Reddit
    }

    fn name(&self) -> &'static str {
        "Reddit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{"kind": "Listing", "data": {"children": [
        {"kind": "t3", "data": {"id": "abc1", "title": "Weekly thread", "stickied": true,
          "permalink": "/r/rust/comments/abc1/", "score": 5, "num_comments": 100, "created_utc": 1760000000.0}},
        {"kind": "t3", "data": {"id": "abc2", "title": "Rust 2.0?", "url": "https://blog.test/rust",
          "permalink": "/r/rust/comments/abc2/", "score": 900, "num_comments": 321,
          "created_utc": 1760003600.0, "author": "ferris", "thumbnail": "self",
          "link_flair_text": "news", "subreddit": "rust"}},
        {"kind": "t3", "data": {"id": "abc3", "title": "Self post", "url": "",
          "permalink": "/r/rust/comments/abc3/", "score": -4, "num_comments": 2,
          "selftext": "&lt;p&gt;hi&lt;/p&gt;", "thumbnail": "https://thumbs.test/x.jpg"}}
    ]}}"#;

    #[tokio::test]
    async fn stickied_posts_are_skipped() {
        let recs = RedditProvider::from_fixture("rust", LISTING).fetch_latest().await.unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].native_key, "abc2");
        assert_eq!(recs[0].engagement, 900.0);
        assert_eq!(recs[0].published, Some(RawTimestamp::Unix(1_760_003_600)));
    }

    #[tokio::test]
    async fn empty_url_falls_back_to_permalink_and_negative_score_to_zero() {
        let recs = RedditProvider::from_fixture("rust", LISTING).fetch_latest().await.unwrap();
        let r = &recs[1];
        assert_eq!(r.url, "https://reddit.com/r/rust/comments/abc3/");
        assert_eq!(r.engagement, 0.0);
        assert_eq!(r.published, None);
        match &r.meta {
            SourceMeta::Reddit(m) => {
                assert_eq!(m.subreddit, "rust");
                assert_eq!(m.score, -4);
                assert_eq!(m.thumbnail, "https://thumbs.test/x.jpg");
            }
            other => panic!("unexpected meta {other:?}"),
        }
    }

    #[tokio::test]
    async fn one_bad_listing_does_not_sink_the_rest() {
        let p = RedditProvider::from_fixtures(vec![
            ("broken".into(), "<html>rate limited</html>".into()),
            ("rust".into(), LISTING.into()),
        ]);
        let recs = p.fetch_latest().await.unwrap();
        assert_eq!(recs.len(), 2);
    }
}
