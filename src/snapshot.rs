//! Output document and its persistence.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::item::TrendingItem;
use crate::rank::{Ranked, TractionStats};
use crate::source::Source;

/// The persisted artifact of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub generated_at: DateTime<Utc>,
    pub total_items: usize,
    pub sources: BTreeMap<Source, usize>,
    pub traction_stats: TractionStats,
    pub items: Vec<TrendingItem>,
}

/// Pure assembly. `total_items` is taken from `items` itself.
pub fn build(
    generated_at: DateTime<Utc>,
    items: Vec<TrendingItem>,
    sources: BTreeMap<Source, usize>,
    traction_stats: TractionStats,
) -> SnapshotDocument {
    SnapshotDocument {
        generated_at,
        total_items: items.len(),
        sources,
        traction_stats,
        items,
    }
}

impl SnapshotDocument {
    pub fn from_ranked(generated_at: DateTime<Utc>, ranked: Ranked) -> Self {
        build(generated_at, ranked.items, ranked.sources, ranked.stats)
    }

    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        build(generated_at, Vec::new(), BTreeMap::new(), TractionStats::default())
    }

    /// Per-source counts, largest first (ties by canonical order).
    pub fn breakdown(&self) -> Vec<(Source, usize)> {
        let mut v: Vec<(Source, usize)> = self.sources.iter().map(|(s, n)| (*s, *n)).collect();
        v.sort_by(|a, b| b.1.cmp(&a.1));
        v
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serializing snapshot")
    }

    /// Write as pretty JSON. Parent dirs are created; the file is replaced
    /// via a sibling temp file so readers never see a half-written snapshot.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating output dir {}", dir.display()))?;
        }
        let body = self.to_json_pretty()?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("moving {} to {}", tmp.display(), path.display()))?;
        Ok(())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading snapshot from {}", path.display()))?;
        serde_json::from_str(&s).context("parsing snapshot json")
    }
}
