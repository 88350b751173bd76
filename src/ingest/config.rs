// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::pipeline::PipelineSettings;
use crate::rank::MAX_TOTAL_ITEMS;
use crate::scoring::{TractionMix, TractionScorer, DEFAULT_HALF_LIFE_HOURS};
use crate::source_weights::SourceWeightsConfig;
use crate::text::SUMMARY_MAX_CHARS;

pub const ENV_CONFIG_PATH: &str = "FETCHER_CONFIG_PATH";
pub const ENV_OUTPUT_PATH: &str = "FETCHER_OUTPUT_PATH";
pub const ENV_SERVE_ADDR: &str = "FETCHER_SERVE_ADDR";

pub const DEFAULT_OUTPUT_PATH: &str = "client/public/data/feed.json";

/// Longest GitHub "created within" window, in days.
pub const MAX_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub output_path: PathBuf,
    pub max_items_per_source: usize,
    pub max_total_items: usize,
    pub summary_max_chars: usize,
    pub half_life_hours: f64,
    pub mix: TractionMix,
    /// Overrides on top of the built-in source weights.
    pub source_weights: HashMap<String, f64>,
    /// Optional JSON weight table (see `SourceWeightsConfig`).
    pub source_weights_path: Option<PathBuf>,
    pub concurrency: usize,
    pub provider_timeout_secs: u64,
    /// Politeness delay between requests of the same provider.
    pub request_delay_ms: u64,
    pub refresh_interval_secs: Option<u64>,
    pub serve: ServeConfig,
    pub hackernews: HackerNewsConfig,
    pub reddit: RedditConfig,
    pub github: GitHubConfig,
    pub youtube: YouTubeConfig,
    pub rss: RssConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub addr: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HackerNewsConfig {
    pub story_types: Vec<String>,
    pub top_n: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub subreddits: Vec<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Empty string means "all languages".
    pub languages: Vec<String>,
    pub per_page: usize,
    pub window_days: i64,
    pub min_stars: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    pub search_terms: Vec<String>,
    pub max_results: usize,
    /// Used for keyless searches when no API key is set.
    pub ytdlp_binary: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RssConfig {
    pub feeds: Vec<String>,
    pub entries_per_feed: usize,
}

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            max_items_per_source: 30,
            max_total_items: MAX_TOTAL_ITEMS,
            summary_max_chars: SUMMARY_MAX_CHARS,
            half_life_hours: DEFAULT_HALF_LIFE_HOURS,
            mix: TractionMix::default(),
            source_weights: HashMap::new(),
            source_weights_path: None,
            concurrency: 5,
            provider_timeout_secs: 120,
            request_delay_ms: 500,
            refresh_interval_secs: None,
            serve: ServeConfig::default(),
            hackernews: HackerNewsConfig::default(),
            reddit: RedditConfig::default(),
            github: GitHubConfig::default(),
            youtube: YouTubeConfig::default(),
            rss: RssConfig::default(),
        }
    }
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            story_types: strings(&["topstories", "beststories"]),
            top_n: 60,
        }
    }
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            subreddits: strings(&[
                "technology",
                "programming",
                "MachineLearning",
                "artificial",
                "LocalLLaMA",
                "webdev",
                "devops",
                "netsec",
                "Futurology",
                "gadgets",
                "hardware",
                "linux",
                "Python",
                "javascript",
                "rust",
                "golang",
            ]),
            limit: 15,
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            languages: strings(&["", "python", "typescript", "rust", "go"]),
            per_page: 10,
            window_days: 7,
            min_stars: 10,
        }
    }
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            search_terms: strings(&[
                "AI news",
                "tech news this week",
                "machine learning tutorial",
                "open source project",
                "programming tutorial trending",
            ]),
            max_results: 10,
            ytdlp_binary: "yt-dlp".to_string(),
        }
    }
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            feeds: strings(&[
                "https://feeds.feedburner.com/TechCrunch/",
                "https://www.theverge.com/rss/index.xml",
                "https://www.wired.com/feed/rss",
                "https://arstechnica.com/feed/",
                "https://www.technologyreview.com/feed/",
                "https://venturebeat.com/feed/",
                "https://hnrss.org/frontpage",
            ]),
            entries_per_feed: 15,
        }
    }
}

impl FetcherConfig {
    /// Put nonsense values back to their defaults.
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();
        if self.max_total_items == 0 {
            self.max_total_items = d.max_total_items;
        }
        if self.max_items_per_source == 0 {
            self.max_items_per_source = d.max_items_per_source;
        }
        if self.summary_max_chars == 0 {
            self.summary_max_chars = d.summary_max_chars;
        }
        if !(self.half_life_hours.is_finite() && self.half_life_hours > 0.0) {
            self.half_life_hours = d.half_life_hours;
        }
        if self.concurrency == 0 {
            self.concurrency = d.concurrency;
        }
        if self.provider_timeout_secs == 0 {
            self.provider_timeout_secs = d.provider_timeout_secs;
        }
        if self.refresh_interval_secs == Some(0) {
            self.refresh_interval_secs = None;
        }
        self.github.window_days = self.github.window_days.clamp(1, MAX_WINDOW_DAYS);
        self.mix = self.mix.normalized();
        self
    }

    /// Env overrides applied after the file.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(p) = std::env::var(ENV_OUTPUT_PATH) {
            if !p.trim().is_empty() {
                self.output_path = PathBuf::from(p.trim());
            }
        }
        if let Ok(a) = std::env::var(ENV_SERVE_ADDR) {
            if !a.trim().is_empty() {
                self.serve.addr = Some(a.trim().to_string());
            }
        }
        self
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            max_total_items: self.max_total_items,
            summary_max_chars: self.summary_max_chars,
        }
    }

    /// Scorer with this config's weights, mix and half-life.
    pub fn scorer(&self) -> TractionScorer {
        let mut weights = match &self.source_weights_path {
            Some(p) => SourceWeightsConfig::load_from_file(p),
            None => SourceWeightsConfig::default_seed(),
        };
        weights.apply_overrides(&self.source_weights);
        TractionScorer::new(weights, self.mix, self.half_life_hours)
    }
}

/// Optional credentials from the environment. They raise quotas only and
/// never change scoring.
#[derive(Clone, Default)]
pub struct Credentials {
    pub youtube_api_key: Option<String>,
    pub github_token: Option<String>,
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // presence only, never the values
        f.debug_struct("Credentials")
            .field("youtube_api_key", &self.youtube_api_key.is_some())
            .field("github_token", &self.github_token.is_some())
            .field("reddit_client_id", &self.reddit_client_id.is_some())
            .field("reddit_client_secret", &self.reddit_client_secret.is_some())
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Self {
        fn var(k: &str) -> Option<String> {
            std::env::var(k)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        Self {
            youtube_api_key: var("YOUTUBE_API_KEY"),
            github_token: var("GITHUB_TOKEN"),
            reddit_client_id: var("REDDIT_CLIENT_ID"),
            reddit_client_secret: var("REDDIT_CLIENT_SECRET"),
        }
    }
}

/// Load config from an explicit path. Supports TOML or JSON.
pub fn load_config_from(path: &Path) -> Result<FetcherConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading fetcher config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str()).map(FetcherConfig::sanitized)
}

/// Load config using env var + fallbacks:
/// 1) $FETCHER_CONFIG_PATH
/// 2) config/fetcher.toml
/// 3) config/fetcher.json
/// 4) built-in defaults
///
/// Env overrides (`FETCHER_OUTPUT_PATH`, `FETCHER_SERVE_ADDR`) apply on top.
pub fn load_config_default() -> Result<FetcherConfig> {
    let cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        load_config_from(&pb)?
    } else {
        let toml_p = PathBuf::from("config/fetcher.toml");
        let json_p = PathBuf::from("config/fetcher.json");
        if toml_p.exists() {
            load_config_from(&toml_p)?
        } else if json_p.exists() {
            load_config_from(&json_p)?
        } else {
            FetcherConfig::default()
        }
    };
    Ok(cfg.with_env_overrides())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<FetcherConfig> {
    match hint_ext {
        "toml" => toml::from_str(s).context("parsing fetcher config toml"),
        "json" => serde_json::from_str(s).context("parsing fetcher config json"),
        _ => serde_json::from_str(s)
            .or_else(|_| toml::from_str(s))
            .map_err(|_| anyhow!("unsupported fetcher config format")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = parse_config(
            r#"
max_total_items = 50
[reddit]
subreddits = ["rust"]
"#,
            "toml",
        )
        .unwrap();
        assert_eq!(cfg.max_total_items, 50);
        assert_eq!(cfg.reddit.subreddits, vec!["rust".to_string()]);
        assert_eq!(cfg.reddit.limit, 15);
        assert_eq!(cfg.hackernews.top_n, 60);
        assert_eq!(cfg.rss.feeds.len(), 7);
    }

    #[test]
    fn json_without_hint_is_detected() {
        let cfg = parse_config(r#"{"concurrency": 2}"#, "").unwrap();
        assert_eq!(cfg.concurrency, 2);
        assert!(parse_config("::: nope :::", "").is_err());
    }

    #[test]
    fn sanitize_restores_defaults() {
        let cfg = FetcherConfig {
            max_total_items: 0,
            concurrency: 0,
            half_life_hours: -3.0,
            refresh_interval_secs: Some(0),
            mix: TractionMix {
                engagement: 2.0,
                discussion: 0.0,
                recency: 2.0,
                source: 0.0,
            },
            ..FetcherConfig::default()
        }
        .sanitized();
        assert_eq!(cfg.max_total_items, MAX_TOTAL_ITEMS);
        assert_eq!(cfg.concurrency, 5);
        assert_eq!(cfg.half_life_hours, DEFAULT_HALF_LIFE_HOURS);
        assert_eq!(cfg.refresh_interval_secs, None);
        assert!((cfg.mix.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn window_days_is_clamped() {
        let mut cfg = FetcherConfig::default();
        cfg.github.window_days = i64::MAX;
        assert_eq!(cfg.sanitized().github.window_days, MAX_WINDOW_DAYS);

        let mut cfg = FetcherConfig::default();
        cfg.github.window_days = -4;
        assert_eq!(cfg.sanitized().github.window_days, 1);
    }

    #[test]
    fn credentials_debug_hides_values() {
        let c = Credentials {
            github_token: Some("ghp_secret".into()),
            ..Credentials::default()
        };
        let s = format!("{c:?}");
        assert!(!s.contains("ghp_secret"));
        assert!(s.contains("github_token: true"));
    }
}
