// src/ingest/providers/youtube.rs
//! YouTube Data API v3: search per term, then one statistics lookup per
//! 50 video ids. Without an API key the search runs through `yt-dlp`
//! (flat playlist, views only); a missing binary yields nothing.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::process::Command;

use super::{get_text, polite_pause, skip_sub_request};
use crate::dates::RawTimestamp;
use crate::ingest::config::YouTubeConfig;
use crate::ingest::types::{RawRecord, SourceProvider};
use crate::item::{SourceMeta, YouTubeMeta};
use crate::source::Source;
use crate::text::truncate_chars;

const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const VIDEOS_URL: &str = "https://www.googleapis.com/youtube/v3/videos";
const STATS_BATCH: usize = 50;
const LIKE_WEIGHT: f64 = 10.0;
const YTDLP_PER_TERM: usize = 8;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Snippet {
    title: String,
    description: String,
    channel_title: String,
    channel_id: String,
    published_at: String,
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Thumbnails {
    medium: Option<Thumb>,
}

#[derive(Debug, Deserialize)]
struct Thumb {
    url: String,
}

#[derive(Debug, Clone, PartialEq)]
struct SearchHit {
    video_id: String,
    title: String,
    description: String,
    channel_title: String,
    channel_id: String,
    published_at: String,
    thumbnail: String,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    #[serde(default)]
    statistics: Statistics,
    #[serde(default)]
    content_details: ContentDetails,
}

// The API sends counts as strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContentDetails {
    duration: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct VideoStats {
    views: u64,
    likes: u64,
    comments: u64,
    duration: String,
}

// `yt-dlp --flat-playlist -J` output. Numbers may come back as floats.
#[derive(Debug, Deserialize)]
struct FlatPlaylist {
    #[serde(default)]
    entries: Vec<Option<FlatEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FlatEntry {
    id: String,
    title: String,
    description: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    channel_id: Option<String>,
    upload_date: Option<String>,
    duration: Option<f64>,
    view_count: Option<f64>,
}

fn count(s: &Option<String>) -> u64 {
    s.as_deref().and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

/// Append hits from one search response, skipping ids already in `seen`.
fn parse_search(s: &str, seen: &mut HashSet<String>, out: &mut Vec<SearchHit>) -> Result<()> {
    let resp: SearchResponse = serde_json::from_str(s).context("parsing youtube search json")?;
    for it in resp.items {
        let Some(video_id) = it.id.video_id.filter(|v| !v.is_empty()) else {
            continue;
        };
        if !seen.insert(video_id.clone()) {
            continue;
        }
        let sn = it.snippet;
        out.push(SearchHit {
            video_id,
            title: sn.title,
            description: truncate_chars(&sn.description, 300),
            channel_title: sn.channel_title,
            channel_id: sn.channel_id,
            published_at: sn.published_at,
            thumbnail: sn.thumbnails.medium.map(|t| t.url).unwrap_or_default(),
        });
    }
    Ok(())
}

fn parse_videos(s: &str, into: &mut HashMap<String, VideoStats>) -> Result<()> {
    let resp: VideosResponse = serde_json::from_str(s).context("parsing youtube videos json")?;
    for v in resp.items {
        into.insert(
            v.id,
            VideoStats {
                views: count(&v.statistics.view_count),
                likes: count(&v.statistics.like_count),
                comments: count(&v.statistics.comment_count),
                duration: format_duration(&v.content_details.duration),
            },
        );
    }
    Ok(())
}

/// ISO-8601 `PT1H2M3S` -> `1:02:03`, `PT4M5S` -> `4:05`. Unknown -> "".
pub fn format_duration(iso: &str) -> String {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").expect("duration regex")
    });
    let Some(caps) = re.captures(iso.trim()) else {
        return String::new();
    };
    let part = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    clock(part(1), part(2), part(3))
}

/// Seconds -> `m:ss` or `h:mm:ss`. Zero or unknown -> "".
pub fn format_seconds(secs: f64) -> String {
    if !(secs.is_finite() && secs >= 1.0) {
        return String::new();
    }
    let secs = secs as u64;
    clock(secs / 3600, secs % 3600 / 60, secs % 60)
}

fn clock(h: u64, m: u64, s: u64) -> String {
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// Append records from one `yt-dlp` search, skipping ids already in `seen`.
fn parse_flat_playlist(s: &str, seen: &mut HashSet<String>, out: &mut Vec<RawRecord>) -> Result<()> {
    let list: FlatPlaylist = serde_json::from_str(s).context("parsing yt-dlp json")?;
    for e in list.entries.into_iter().flatten() {
        if e.id.is_empty() || !seen.insert(e.id.clone()) {
            continue;
        }
        let views = e.view_count.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0) as u64;
        let author = e
            .channel
            .filter(|c| !c.is_empty())
            .or(e.uploader)
            .unwrap_or_default();
        out.push(RawRecord {
            native_key: e.id.clone(),
            item_type: "video".to_string(),
            title: e.title,
            body: Some(truncate_chars(e.description.as_deref().unwrap_or_default(), 300)),
            url: format!("https://www.youtube.com/watch?v={}", e.id),
            author,
            // YYYYMMDD; flat results often omit it, which resolves to "now"
            published: e.upload_date.filter(|d| !d.is_empty()).map(RawTimestamp::Text),
            engagement: views as f64,
            discussion: 0.0,
            meta: SourceMeta::YouTube(YouTubeMeta {
                thumbnail: format!("https://i.ytimg.com/vi/{}/mqdefault.jpg", e.id),
                video_id: e.id,
                channel_id: e.channel_id.unwrap_or_default(),
                duration: e.duration.map(format_seconds).unwrap_or_default(),
                view_count: views,
                like_count: 0,
                comment_count: 0,
            }),
        });
    }
    Ok(())
}

/// Outcome of one `yt-dlp` invocation.
enum YtDlpRun {
    Json(String),
    Missing,
}

async fn run_ytdlp(binary: &str, term: &str) -> Result<YtDlpRun> {
    let query = format!("ytsearch{YTDLP_PER_TERM}:{term}");
    let output = match Command::new(binary)
        .args(["--flat-playlist", "-J", "--no-warnings", query.as_str()])
        .kill_on_drop(true)
        .output()
        .await
    {
        Ok(o) => o,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(YtDlpRun::Missing),
        Err(e) => return Err(e).with_context(|| format!("spawning {binary}")),
    };
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "{binary} exited with {:?}: {}",
            output.status.code(),
            truncate_chars(stderr.trim(), 200)
        );
    }
    Ok(YtDlpRun::Json(String::from_utf8_lossy(&output.stdout).into_owned()))
}

fn combine(hits: Vec<SearchHit>, stats: &HashMap<String, VideoStats>) -> Vec<RawRecord> {
    hits.into_iter()
        .map(|h| {
            let st = stats.get(&h.video_id).cloned().unwrap_or_default();
            RawRecord {
                native_key: h.video_id.clone(),
                item_type: "video".to_string(),
                title: h.title,
                body: Some(h.description),
                url: format!("https://www.youtube.com/watch?v={}", h.video_id),
                author: h.channel_title,
                published: Some(RawTimestamp::Text(h.published_at)),
                engagement: st.views as f64 + st.likes as f64 * LIKE_WEIGHT,
                discussion: st.comments as f64,
                meta: SourceMeta::YouTube(YouTubeMeta {
                    video_id: h.video_id,
                    channel_id: h.channel_id,
                    thumbnail: h.thumbnail,
                    duration: st.duration,
                    view_count: st.views,
                    like_count: st.likes,
                    comment_count: st.comments,
                }),
            }
        })
        .collect()
}

pub struct YouTubeProvider {
    mode: Mode,
}

enum Mode {
    /// (search response bodies, videos response bodies)
    Fixture(Vec<String>, Vec<String>),
    /// `yt-dlp -J` outputs, one per search term.
    FlatFixture(Vec<String>),
    Http {
        client: reqwest::Client,
        cfg: YouTubeConfig,
        api_key: Option<String>,
        delay: Duration,
    },
}

impl YouTubeProvider {
    pub fn from_fixture(search_json: &str, videos_json: &str) -> Self {
        Self {
            mode: Mode::Fixture(vec![search_json.to_string()], vec![videos_json.to_string()]),
        }
    }

    pub fn from_ytdlp_fixture(playlists: Vec<String>) -> Self {
        Self {
            mode: Mode::FlatFixture(playlists),
        }
    }

    pub fn from_http(
        client: reqwest::Client,
        cfg: YouTubeConfig,
        api_key: Option<String>,
        delay: Duration,
    ) -> Self {
        Self {
            mode: Mode::Http {
                client,
                cfg,
                api_key,
                delay,
            },
        }
    }

    async fn crawl(
        client: &reqwest::Client,
        cfg: &YouTubeConfig,
        key: &str,
        delay: Duration,
    ) -> Vec<RawRecord> {
        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        for term in &cfg.search_terms {
            tracing::debug!(target: "ingest", term = %term, "youtube search");
            let max = cfg.max_results.to_string();
            let req = client.get(SEARCH_URL).query(&[
                ("part", "snippet"),
                ("q", term.as_str()),
                ("type", "video"),
                ("order", "relevance"),
                ("maxResults", max.as_str()),
                ("key", key),
            ]);
            let res = match get_text(req, "youtube search").await {
                Ok(body) => parse_search(&body, &mut seen, &mut hits),
                Err(e) => Err(e),
            };
            if let Err(e) = res {
                skip_sub_request("YouTube", term, &e);
            }
            polite_pause(delay).await;
        }

        let ids: Vec<String> = hits.iter().map(|h| h.video_id.clone()).collect();
        let mut stats = HashMap::new();
        for chunk in ids.chunks(STATS_BATCH) {
            let joined = chunk.join(",");
            let req = client.get(VIDEOS_URL).query(&[
                ("part", "statistics,contentDetails"),
                ("id", joined.as_str()),
                ("key", key),
            ]);
            let res = match get_text(req, "youtube videos").await {
                Ok(body) => parse_videos(&body, &mut stats),
                Err(e) => Err(e),
            };
            // Missing stats only lower the score; the hits are kept.
            if let Err(e) = res {
                skip_sub_request("YouTube", "videos", &e);
            }
        }

        combine(hits, &stats)
    }

    async fn search_keyless(cfg: &YouTubeConfig, delay: Duration) -> Vec<RawRecord> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for term in &cfg.search_terms {
            tracing::debug!(target: "ingest", term = %term, "yt-dlp search");
            let res = match run_ytdlp(&cfg.ytdlp_binary, term).await {
                Ok(YtDlpRun::Json(body)) => parse_flat_playlist(&body, &mut seen, &mut out),
                Ok(YtDlpRun::Missing) => {
                    tracing::info!(
                        target: "ingest",
                        binary = %cfg.ytdlp_binary,
                        "no YOUTUBE_API_KEY and yt-dlp not found, skipping YouTube"
                    );
                    break;
                }
                Err(e) => Err(e),
            };
            if let Err(e) = res {
                skip_sub_request("YouTube", term, &e);
            }
            polite_pause(delay).await;
        }
        out
    }
}

#[async_trait]
impl SourceProvider for YouTubeProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawRecord>> {
        let out = match &self.mode {
            Mode::Fixture(searches, videos) => {
                let mut seen = HashSet::new();
                let mut hits = Vec::new();
                for s in searches {
                    parse_search(s, &mut seen, &mut hits)?;
                }
                let mut stats = HashMap::new();
                for v in videos {
                    parse_videos(v, &mut stats)?;
                }
                combine(hits, &stats)
            }
            Mode::FlatFixture(playlists) => {
                let mut seen = HashSet::new();
                let mut out = Vec::new();
                for p in playlists {
                    parse_flat_playlist(p, &mut seen, &mut out)?;
                }
                out
            }
            Mode::Http {
                client,
                cfg,
                api_key,
                delay,
            } => match api_key {
                Some(key) => Self::crawl(client, cfg, key, *delay).await,
                None => Self::search_keyless(cfg, *delay).await,
            },
        };
        counter!("ingest_records_total", "source" => "youtube").increment(out.len() as u64);
        Ok(out)
    }

    fn source(&self) -> Source {
        Source::YouTube
    }

    fn name(&self) -> &'static str {
        "YouTube"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH: &str = r#"{"items": [
        {"id": {"kind": "youtube#video", "videoId": "vid1"},
         "snippet": {"title": "Tech news this week", "description": "All the news",
                     "channelTitle": "TechChan", "channelId": "UC1",
                     "publishedAt": "2026-10-16T18:00:00Z",
                     "thumbnails": {"medium": {"url": "https://i.ytimg.com/vi/vid1/mqdefault.jpg"}}}},
        {"id": {"kind": "youtube#channel", "channelId": "UC9"}, "snippet": {"title": "a channel"}},
        {"id": {"kind": "youtube#video", "videoId": "vid1"}, "snippet": {"title": "dup"}},
        {"id": {"kind": "youtube#video", "videoId": "vid2"},
         "snippet": {"title": "No stats", "publishedAt": "not a date"}}
    ]}"#;

    const VIDEOS: &str = r#"{"items": [
        {"id": "vid1", "statistics": {"viewCount": "12000", "likeCount": "300", "commentCount": "45"},
         "contentDetails": {"duration": "PT1H2M3S"}}
    ]}"#;

    #[tokio::test]
    async fn search_and_stats_are_joined() {
        let recs = YouTubeProvider::from_fixture(SEARCH, VIDEOS).fetch_latest().await.unwrap();
        assert_eq!(recs.len(), 2);
        let r = &recs[0];
        assert_eq!(r.url, "https://www.youtube.com/watch?v=vid1");
        assert_eq!(r.engagement, 12_000.0 + 300.0 * 10.0);
        assert_eq!(r.discussion, 45.0);
        match &r.meta {
            SourceMeta::YouTube(m) => {
                assert_eq!(m.duration, "1:02:03");
                assert_eq!(m.view_count, 12_000);
            }
            other => panic!("unexpected meta {other:?}"),
        }
        assert_eq!(recs[1].engagement, 0.0);
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration("PT4M5S"), "4:05");
        assert_eq!(format_duration("PT45S"), "0:45");
        assert_eq!(format_duration("PT2H"), "2:00:00");
        assert_eq!(format_duration("P1D"), "");
        assert_eq!(format_duration(""), "");
        assert_eq!(format_duration("PT"), "0:00");
    }

    #[test]
    fn seconds_render_like_clock_time() {
        assert_eq!(format_seconds(245.0), "4:05");
        assert_eq!(format_seconds(3723.4), "1:02:03");
        assert_eq!(format_seconds(0.0), "");
        assert_eq!(format_seconds(f64::NAN), "");
    }

    const FLAT: &str = r#"{"_type": "playlist", "id": "tech news", "entries": [
        {"_type": "url", "ie_key": "Youtube", "id": "abc123", "title": "Chips explained",
         "description": null, "duration": 754.0, "channel": "SiliconTV", "channel_id": "UCs",
         "uploader": "silicontv", "view_count": 48213, "upload_date": "20261015"},
        null,
        {"_type": "url", "id": "def456", "title": "No date", "uploader": "solo",
         "view_count": 2500000}
    ]}"#;

    #[tokio::test]
    async fn ytdlp_entries_become_records() {
        let again = r#"{"entries": [{"id": "abc123", "title": "repeat"}]}"#.to_string();
        let recs = YouTubeProvider::from_ytdlp_fixture(vec![FLAT.to_string(), again])
            .fetch_latest()
            .await
            .unwrap();
        assert_eq!(recs.len(), 2);

        let r = &recs[0];
        assert_eq!(r.url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(r.author, "SiliconTV");
        assert_eq!(r.published, Some(RawTimestamp::Text("20261015".into())));
        assert_eq!(r.engagement, 48_213.0);
        assert_eq!(r.discussion, 0.0);
        assert_eq!(r.body.as_deref(), Some(""));
        match &r.meta {
            SourceMeta::YouTube(m) => {
                assert_eq!(m.thumbnail, "https://i.ytimg.com/vi/abc123/mqdefault.jpg");
                assert_eq!(m.duration, "12:34");
                assert_eq!(m.view_count, 48_213);
                assert_eq!(m.channel_id, "UCs");
            }
            other => panic!("unexpected meta {other:?}"),
        }

        assert_eq!(recs[1].author, "solo");
        assert_eq!(recs[1].published, None);
        assert_eq!(recs[1].engagement, 2_500_000.0);
    }

    #[test]
    fn ytdlp_engagement_saturates_at_the_video_cap() {
        let caps = Source::YouTube.signal_caps();
        assert_eq!(caps.engagement, 1_000_000.0);
        let huge = crate::scoring::cap_log_norm(2_500_000.0, caps.engagement);
        assert_eq!(huge, 1.0);
    }

    #[tokio::test]
    async fn no_key_and_no_binary_means_no_items() {
        let client = reqwest::Client::new();
        let cfg = YouTubeConfig {
            ytdlp_binary: "/nonexistent/yt-dlp-missing".into(),
            ..YouTubeConfig::default()
        };
        let p = YouTubeProvider::from_http(client, cfg, None, Duration::ZERO);
        assert!(p.fetch_latest().await.unwrap().is_empty());
    }
}
