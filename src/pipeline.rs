//! Deterministic core: raw batches in, one snapshot out.
//!
//! normalize (+score) -> merge in canonical source order -> dedup -> rank -> build.
//! No I/O and no failure path; an empty input yields a valid empty snapshot.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::dedup::Deduplicator;
use crate::ingest::types::SourceBatch;
use crate::normalize::Normalizer;
use crate::rank::{rank, MAX_TOTAL_ITEMS};
use crate::scoring::TractionScorer;
use crate::snapshot::SnapshotDocument;
use crate::text::SUMMARY_MAX_CHARS;

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub max_total_items: usize,
    pub summary_max_chars: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_total_items: MAX_TOTAL_ITEMS,
            summary_max_chars: SUMMARY_MAX_CHARS,
        }
    }
}

/// Counters from one pass, for logs and metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub raw_records: usize,
    pub duplicates: usize,
    pub truncated: usize,
    pub kept: usize,
}

/// Run the core over already-fetched batches.
///
/// Batches are merged in canonical source order regardless of the order they
/// arrive in; records inside a batch keep the adapter's order.
pub fn run_core(
    mut batches: Vec<SourceBatch>,
    scorer: &TractionScorer,
    now: DateTime<Utc>,
    settings: PipelineSettings,
) -> (SnapshotDocument, RunReport) {
    batches.sort_by_key(|b| b.source.priority());

    let normalizer = Normalizer::new(scorer, now).with_summary_max_chars(settings.summary_max_chars);
    let mut report = RunReport::default();

    let mut merged = Vec::new();
    for batch in batches {
        report.raw_records += batch.records.len();
        merged.extend(normalizer.normalize_all(batch.source, batch.records));
    }

    let deduped = Deduplicator::new().run(merged);
    report.duplicates = deduped.duplicate_count();

    let before_cut = deduped.retained.len();
    let ranked = rank(deduped.retained, settings.max_total_items);
    report.kept = ranked.items.len();
    report.truncated = before_cut - report.kept;

    debug!(
        target: "pipeline",
        raw = report.raw_records,
        duplicates = report.duplicates,
        truncated = report.truncated,
        kept = report.kept,
        "core pass done"
    );

    (SnapshotDocument::from_ranked(now, ranked), report)
}
