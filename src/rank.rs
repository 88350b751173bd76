//! Ranking and summary statistics over the deduplicated set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::item::TrendingItem;
use crate::source::Source;

/// Global output cap.
pub const MAX_TOTAL_ITEMS: usize = 200;

/// Score summary over the ranked set. All zero when the set is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TractionStats {
    pub max_score: f64,
    pub p90_score: f64,
    pub p75_score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Ranked {
    pub items: Vec<TrendingItem>,
    pub sources: BTreeMap<Source, usize>,
    pub stats: TractionStats,
}

/// Sort descending by score, truncate to `cap`, then aggregate.
///
/// `sort_by` is stable, so equal scores keep their input order.
pub fn rank(mut items: Vec<TrendingItem>, cap: usize) -> Ranked {
    items.sort_by(|a, b| b.traction_score.total_cmp(&a.traction_score));
    items.truncate(cap);

    let sources = count_by_source(&items);
    let scores: Vec<f64> = items.iter().map(|i| i.traction_score).collect();
    let stats = score_stats(&scores);

    Ranked {
        items,
        sources,
        stats,
    }
}

pub fn count_by_source(items: &[TrendingItem]) -> BTreeMap<Source, usize> {
    let mut out = BTreeMap::new();
    for it in items {
        *out.entry(it.source).or_insert(0) += 1;
    }
    out
}

/// max / p90 / p75 with the index method: `sorted[floor(len * p)]`.
pub fn score_stats(scores: &[f64]) -> TractionStats {
    if scores.is_empty() {
        return TractionStats::default();
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);
    TractionStats {
        max_score: sorted[sorted.len() - 1],
        p90_score: percentile(&sorted, 0.90),
        p75_score: percentile(&sorted, 0.75),
    }
}

/// `sorted` must be ascending and non-empty.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let idx = (sorted.len() as f64 * p).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::SourceMeta;
    use chrono::{TimeZone, Utc};

    fn scored(id: &str, source: Source, score: f64) -> TrendingItem {
        TrendingItem {
            id: id.into(),
            source,
            item_type: String::new(),
            title: String::new(),
            summary: String::new(),
            url: format!("https://x.test/{id}"),
            author: String::new(),
            published_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            traction_score: score,
            source_meta: SourceMeta::None {},
        }
    }

    #[test]
    fn empty_set_is_all_zero() {
        let r = rank(Vec::new(), MAX_TOTAL_ITEMS);
        assert!(r.items.is_empty());
        assert!(r.sources.is_empty());
        assert_eq!(r.stats, TractionStats::default());
    }

    #[test]
    fn ties_keep_input_order() {
        let r = rank(
            vec![
                scored("a", Source::News, 40.0),
                scored("b", Source::Reddit, 70.0),
                scored("c", Source::HackerNews, 40.0),
                scored("d", Source::GitHub, 70.0),
            ],
            10,
        );
        let ids: Vec<&str> = r.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["b", "d", "a", "c"]);
    }

    #[test]
    fn truncation_keeps_the_best_and_counts_after_cut() {
        let items = (0..10)
            .map(|i| {
                let src = if i < 5 { Source::News } else { Source::HackerNews };
                scored(&i.to_string(), src, i as f64)
            })
            .collect();
        let r = rank(items, 3);
        assert_eq!(r.items.len(), 3);
        assert_eq!(r.items[0].traction_score, 9.0);
        assert_eq!(r.sources.get(&Source::HackerNews), Some(&3));
        assert_eq!(r.sources.get(&Source::News), None);
    }

    #[test]
    fn index_percentiles() {
        // 10 scores 1..=10: p90 -> idx 9, p75 -> idx 7
        let scores: Vec<f64> = (1..=10).rev().map(f64::from).collect();
        let s = score_stats(&scores);
        assert_eq!(s.max_score, 10.0);
        assert_eq!(s.p90_score, 10.0);
        assert_eq!(s.p75_score, 8.0);

        let one = score_stats(&[42.5]);
        assert_eq!(one, TractionStats { max_score: 42.5, p90_score: 42.5, p75_score: 42.5 });
    }
}
