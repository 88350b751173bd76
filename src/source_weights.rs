//! # Source Weights
//!
//! Static trust/virality baseline per source type, in the range `[0.0, 1.0]`.
//! Discussion boards rank highest, plain news feeds lowest.
//!
//! - Built-in `default_seed()` with the five known sources.
//! - Optional overrides from the fetcher config or a JSON file.
//! - Case-insensitive lookup; aliases ("hn", "hacker news") resolve to the
//!   canonical source name.
//! - Unknown names get `default_weight`.

use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

use crate::source::Source;

/// Weight table, loaded from JSON or built from defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceWeightsConfig {
    /// Weight used when a name matches nothing.
    #[serde(default = "default_default_weight")]
    pub default_weight: f64,
    /// Weights keyed by canonical source name.
    #[serde(default)]
    pub weights: HashMap<String, f64>,
}

fn default_default_weight() -> f64 {
    0.50
}

impl Default for SourceWeightsConfig {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl SourceWeightsConfig {
    /// Load from a JSON file. Missing keys keep their seeded value;
    /// an unreadable or malformed file yields `default_seed()`.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => match serde_json::from_str::<SourceWeightsConfig>(&s) {
                Ok(parsed) => {
                    let mut seeded = Self::default_seed();
                    seeded.default_weight = parsed.default_weight;
                    seeded.apply_overrides(&parsed.weights);
                    seeded
                }
                Err(e) => {
                    tracing::warn!(error = %e, "source weights json invalid, using defaults");
                    Self::default_seed()
                }
            },
            Err(_) => Self::default_seed(),
        }
    }

    /// Overlay `overrides` on top of the current table. Keys go through the
    /// same alias resolution as lookups.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, f64>) {
        for (k, &w) in overrides {
            let key = canonical_key(k);
            self.weights.insert(key, clamp01(w));
        }
    }

    /// Weight for a known source.
    pub fn weight(&self, source: Source) -> f64 {
        self.weight_for(source.as_str())
    }

    /// Weight for a source name.
    ///
    /// Steps:
    /// 1. Alias / wire-name resolution to a canonical key.
    /// 2. Exact match in the table.
    /// 3. Default weight.
    pub fn weight_for(&self, source: &str) -> f64 {
        let key = canonical_key(source);
        match self.weights.get(&key) {
            Some(&w) => clamp01(w),
            None => clamp01(self.default_weight),
        }
    }

    /// Built-in table, used when nothing is configured.
    pub fn default_seed() -> Self {
        let mut weights = HashMap::new();
        for (s, w) in [
            (Source::HackerNews, 1.0),
            (Source::Reddit, 0.85),
            (Source::GitHub, 0.75),
            (Source::YouTube, 0.65),
            (Source::News, 0.55),
        ] {
            weights.insert(s.as_str().to_string(), w);
        }
        Self {
            default_weight: default_default_weight(),
            weights,
        }
    }
}

/// Known sources map to their wire name; anything else is normalized text.
fn canonical_key(name: &str) -> String {
    match Source::parse(name) {
        Some(s) => s.as_str().to_string(),
        None => normalize(name),
    }
}

/// Lowercase, turn separators into spaces, collapse runs of spaces.
fn normalize(s: &str) -> String {
    let mut out = s.trim().to_ascii_lowercase();
    for ch in ['—', '–', '-', '_', '/', '\\', '.', ','] {
        out = out.replace(ch, " ");
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(0.0, 1.0)
}
