// src/ingest/types.rs
use anyhow::Result;

use crate::dates::RawTimestamp;
use crate::item::SourceMeta;
use crate::source::Source;

/// One record as extracted by a source adapter, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub native_key: String, // e.g. HN id, reddit post id, repo full name
    pub item_type: String,  // "story", "post", "repo", "video", "article"
    pub title: String,
    pub body: Option<String>, // may contain HTML
    pub url: String,
    pub author: String,
    pub published: Option<RawTimestamp>,
    pub engagement: f64, // points, stars, views + weighted likes
    pub discussion: f64, // comments, forks
    pub meta: SourceMeta,
}

impl RawRecord {
    /// Minimal record; signals default to 0, meta to empty.
    pub fn new(native_key: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            native_key: native_key.into(),
            item_type: String::new(),
            title: title.into(),
            body: None,
            url: url.into(),
            author: String::new(),
            published: None,
            engagement: 0.0,
            discussion: 0.0,
            meta: SourceMeta::None {},
        }
    }
}

/// Records of one source, in the order the adapter produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBatch {
    pub source: Source,
    pub records: Vec<RawRecord>,
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<RawRecord>>;
    fn source(&self) -> Source;
    fn name(&self) -> &'static str;
}
