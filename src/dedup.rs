//! Cross-source deduplication.
//!
//! URL equality is the cross-source signal (an aggregator post linking a news
//! article); id equality catches a source repeating its own entries. First
//! occurrence wins, so input order decides ties.

use std::collections::HashSet;

use crate::item::TrendingItem;

/// Seen-sets for one run. Create a fresh one per run.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen_urls: HashSet<String>,
    seen_ids: HashSet<String>,
}

/// Outcome of a dedup pass.
#[derive(Debug, Clone, Default)]
pub struct DedupResult {
    pub retained: Vec<TrendingItem>,
    pub duplicates: Vec<TrendingItem>,
}

impl DedupResult {
    pub fn duplicate_count(&self) -> usize {
        self.duplicates.len()
    }
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if the item is new (and remembers it), `false` if its url or id
    /// was seen before.
    pub fn admit(&mut self, item: &TrendingItem) -> bool {
        if self.seen_urls.contains(&item.url) || self.seen_ids.contains(&item.id) {
            return false;
        }
        self.seen_urls.insert(item.url.clone());
        self.seen_ids.insert(item.id.clone());
        true
    }

    /// Stable filter over `items`.
    pub fn run(&mut self, items: impl IntoIterator<Item = TrendingItem>) -> DedupResult {
        let mut out = DedupResult::default();
        for item in items {
            if self.admit(&item) {
                out.retained.push(item);
            } else {
                out.duplicates.push(item);
            }
        }
        out
    }
}

/// One-shot dedup with fresh seen-sets.
pub fn deduplicate(items: Vec<TrendingItem>) -> Vec<TrendingItem> {
    Deduplicator::new().run(items).retained
}
