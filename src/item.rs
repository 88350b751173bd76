//! Canonical trending item and the per-source auxiliary data it carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::Source;

/// One normalized, scored item. Built once by the normalizer, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingItem {
    pub id: String,
    pub source: Source,
    pub item_type: String,
    pub title: String,
    pub summary: String,
    pub url: String,
    pub author: String,
    pub published_at: DateTime<Utc>,
    pub traction_score: f64,
    pub source_meta: SourceMeta,
}

/// Source-specific passthrough fields. Serialized untagged, so on the wire
/// this is a flat key/value map whose keys depend on the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceMeta {
    HackerNews(HackerNewsMeta),
    Reddit(RedditMeta),
    GitHub(GitHubMeta),
    YouTube(YouTubeMeta),
    News(NewsMeta),
    None {},
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HackerNewsMeta {
    pub hn_id: u64,
    pub points: u64,
    pub num_comments: u64,
    pub story_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditMeta {
    pub subreddit: String,
    pub score: i64,
    pub num_comments: u64,
    pub thumbnail: String,
    pub flair: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubMeta {
    pub stars: u64,
    pub forks: u64,
    pub language: String,
    pub topics: Vec<String>,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YouTubeMeta {
    pub video_id: String,
    pub channel_id: String,
    pub thumbnail: String,
    pub duration: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsMeta {
    pub feed_title: String,
    pub feed_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_serializes_flat() {
        let m = SourceMeta::GitHub(GitHubMeta {
            stars: 120,
            forks: 8,
            language: "Rust".into(),
            topics: vec!["cli".into()],
            full_name: "octo/tool".into(),
        });
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["stars"], 120);
        assert_eq!(v["full_name"], "octo/tool");
        assert!(v.get("GitHub").is_none());
    }

    #[test]
    fn empty_meta_is_empty_object() {
        let v = serde_json::to_value(SourceMeta::None {}).unwrap();
        assert_eq!(v, serde_json::json!({}));
    }
}
