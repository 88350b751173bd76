//! Source identities known to the pipeline.
//!
//! The declaration order of [`Source`] is the canonical ingestion order, which
//! is also the dedup tie-break order: when the same URL surfaces in two
//! sources, the one listed first here wins.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Discussion board (Hacker News).
    HackerNews,
    /// Social aggregator (Reddit).
    Reddit,
    /// Code-host trend list (GitHub search).
    GitHub,
    /// Video platform (YouTube).
    YouTube,
    /// News feeds (RSS / Atom).
    News,
}

/// Engagement / discussion caps handed to the scorer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalCaps {
    pub engagement: f64,
    pub discussion: f64,
}

pub const DEFAULT_ENGAGEMENT_CAP: f64 = 5_000.0;
pub const DEFAULT_DISCUSSION_CAP: f64 = 500.0;

impl Default for SignalCaps {
    fn default() -> Self {
        Self {
            engagement: DEFAULT_ENGAGEMENT_CAP,
            discussion: DEFAULT_DISCUSSION_CAP,
        }
    }
}

impl Source {
    /// All sources in canonical priority order.
    pub const ALL: [Source; 5] = [
        Source::HackerNews,
        Source::Reddit,
        Source::GitHub,
        Source::YouTube,
        Source::News,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::HackerNews => "hackernews",
            Source::Reddit => "reddit",
            Source::GitHub => "github",
            Source::YouTube => "youtube",
            Source::News => "news",
        }
    }

    /// Position in the canonical ingestion order (0 = highest priority).
    pub fn priority(self) -> usize {
        Source::ALL
            .iter()
            .position(|s| *s == self)
            .unwrap_or(Source::ALL.len())
    }

    /// Scorer caps for this source. Stars and views live on much larger
    /// scales than points or comments.
    pub fn signal_caps(self) -> SignalCaps {
        match self {
            Source::GitHub => SignalCaps {
                engagement: 10_000.0,
                discussion: 2_000.0,
            },
            Source::YouTube => SignalCaps {
                engagement: 1_000_000.0,
                discussion: DEFAULT_DISCUSSION_CAP,
            },
            Source::HackerNews | Source::Reddit | Source::News => SignalCaps::default(),
        }
    }

    /// Parse a wire name or a common alias ("hn", "hacker news", "rss").
    pub fn parse(name: &str) -> Option<Source> {
        let s: String = name
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match s.as_str() {
            "hackernews" | "hn" => Some(Source::HackerNews),
            "reddit" => Some(Source::Reddit),
            "github" | "gh" => Some(Source::GitHub),
            "youtube" | "yt" => Some(Source::YouTube),
            "news" | "rss" | "atom" => Some(Source::News),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_serde() {
        for s in Source::ALL {
            let json = serde_json::to_string(&s).unwrap();
            assert_eq!(json, format!("\"{}\"", s.as_str()));
        }
    }

    #[test]
    fn priority_follows_declaration_order() {
        assert_eq!(Source::HackerNews.priority(), 0);
        assert_eq!(Source::News.priority(), 4);
        let mut sorted = Source::ALL;
        sorted.sort();
        assert_eq!(sorted, Source::ALL);
    }

    #[test]
    fn aliases_parse() {
        assert_eq!(Source::parse("Hacker News"), Some(Source::HackerNews));
        assert_eq!(Source::parse(" HN "), Some(Source::HackerNews));
        assert_eq!(Source::parse("RSS"), Some(Source::News));
        assert_eq!(Source::parse("mastodon"), None);
    }

    #[test]
    fn large_scale_sources_get_larger_caps() {
        assert!(Source::GitHub.signal_caps().engagement > DEFAULT_ENGAGEMENT_CAP);
        assert!(Source::YouTube.signal_caps().engagement > Source::GitHub.signal_caps().engagement);
        assert_eq!(Source::News.signal_caps(), SignalCaps::default());
    }
}
