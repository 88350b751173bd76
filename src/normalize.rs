//! Raw record -> canonical [`TrendingItem`].

use chrono::{DateTime, Utc};

use crate::dates;
use crate::ids::make_id;
use crate::ingest::types::RawRecord;
use crate::item::TrendingItem;
use crate::scoring::TractionScorer;
use crate::source::Source;
use crate::text::{clean_title, strip_html, SUMMARY_MAX_CHARS};

/// Normalizes records against a single processing time, so every item of a
/// run ages from the same instant.
#[derive(Debug, Clone)]
pub struct Normalizer<'a> {
    scorer: &'a TractionScorer,
    now: DateTime<Utc>,
    summary_max_chars: usize,
}

impl<'a> Normalizer<'a> {
    pub fn new(scorer: &'a TractionScorer, now: DateTime<Utc>) -> Self {
        Self {
            scorer,
            now,
            summary_max_chars: SUMMARY_MAX_CHARS,
        }
    }

    pub fn with_summary_max_chars(mut self, max: usize) -> Self {
        self.summary_max_chars = max;
        self
    }

    pub fn normalize(&self, source: Source, raw: RawRecord) -> TrendingItem {
        let published_at = dates::resolve(raw.published.as_ref(), self.now);
        let age_h = dates::age_hours(published_at, self.now);
        let traction_score = self.scorer.score(
            source,
            raw.engagement,
            raw.discussion,
            age_h,
            source.signal_caps(),
        );

        TrendingItem {
            id: make_id(source, &raw.native_key),
            source,
            item_type: raw.item_type,
            title: clean_title(&raw.title),
            summary: strip_html(raw.body.as_deref().unwrap_or_default(), self.summary_max_chars),
            url: raw.url.trim().to_string(),
            author: raw.author,
            published_at,
            traction_score,
            source_meta: raw.meta,
        }
    }

    /// Normalize a whole batch, keeping its order.
    pub fn normalize_all(&self, source: Source, records: Vec<RawRecord>) -> Vec<TrendingItem> {
        records
            .into_iter()
            .map(|r| self.normalize(source, r))
            .collect()
    }
}
