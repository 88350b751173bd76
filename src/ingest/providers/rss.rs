// src/ingest/providers/rss.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use metrics::counter;
use quick_xml::de::from_str;
use once_cell::sync::OnceCell;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::borrow::Cow;

use super::{get_text, skip_sub_request};
use crate::dates::RawTimestamp;
use crate::ingest::config::RssConfig;
use crate::ingest::types::{RawRecord, SourceProvider};
use crate::item::{NewsMeta, SourceMeta};
use crate::source::Source;

// --- RSS 2.0 ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "dc:date", alias = "date")]
    dc_date: Option<String>,
    description: Option<String>,
    author: Option<String>,
    #[serde(rename = "dc:creator", alias = "creator")]
    creator: Option<String>,
}

// --- Atom ---

#[derive(Debug, Deserialize)]
struct Atom {
    title: Option<TextNode>,
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: Option<TextNode>,
    #[serde(default)]
    link: Vec<AtomLink>,
    id: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<TextNode>,
    content: Option<TextNode>,
    author: Option<AtomAuthor>,
}

/// Element whose text we want regardless of its `type=` attribute.
#[derive(Debug, Default, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

/// One entry in source-neutral form.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FeedEntry {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedFeed {
    pub title: String,
    pub entries: Vec<FeedEntry>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse RSS 2.0 or Atom.
pub(crate) fn parse_feed(xml: &str) -> Result<ParsedFeed> {
    let xml_clean = scrub_html_entities_for_xml(xml);

    let rss_err = match from_str::<Rss>(&xml_clean) {
        Ok(rss) => {
            let entries = rss
                .channel
                .item
                .into_iter()
                .map(|it| FeedEntry {
                    title: it.title.unwrap_or_default(),
                    link: non_empty(it.link).or_else(|| non_empty(it.guid)).unwrap_or_default(),
                    summary: it.description.unwrap_or_default(),
                    published: non_empty(it.pub_date).or_else(|| non_empty(it.dc_date)),
                    author: non_empty(it.author).or_else(|| non_empty(it.creator)),
                })
                .collect();
            return Ok(ParsedFeed {
                title: rss.channel.title.unwrap_or_default(),
                entries,
            });
        }
        Err(e) => e,
    };

    match from_str::<Atom>(&xml_clean) {
        Ok(atom) if !atom.entry.is_empty() || atom.title.is_some() => {
            let entries = atom
                .entry
                .into_iter()
                .map(|e| {
                    let link = e
                        .link
                        .iter()
                        .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
                        .or_else(|| e.link.first())
                        .map(|l| l.href.clone())
                        .filter(|h| !h.is_empty())
                        .or_else(|| non_empty(e.id))
                        .unwrap_or_default();
                    FeedEntry {
                        title: e.title.map(|t| t.text).unwrap_or_default(),
                        link,
                        summary: e
                            .summary
                            .or(e.content)
                            .map(|t| t.text)
                            .unwrap_or_default(),
                        published: non_empty(e.published).or_else(|| non_empty(e.updated)),
                        author: e.author.and_then(|a| non_empty(a.name)),
                    }
                })
                .collect();
            Ok(ParsedFeed {
                title: atom.title.map(|t| t.text.trim().to_string()).unwrap_or_default(),
                entries,
            })
        }
        _ => Err(anyhow!("neither rss nor atom: {rss_err}")),
    }
}

/// First `limit` entries of a parsed feed as raw records.
pub(crate) fn records_from_feed(feed: ParsedFeed, feed_url: &str, limit: usize) -> Vec<RawRecord> {
    let feed_title = feed.title;
    feed.entries
        .into_iter()
        .take(limit)
        .filter(|e| !(e.link.is_empty() && e.title.trim().is_empty()))
        .map(|e| RawRecord {
            native_key: e.link.clone(),
            item_type: "article".to_string(),
            title: e.title,
            body: Some(e.summary),
            url: e.link,
            author: e.author.unwrap_or_else(|| feed_title.clone()),
            published: e.published.map(RawTimestamp::Text),
            engagement: 0.0,
            discussion: 0.0,
            meta: SourceMeta::News(NewsMeta {
                feed_title: feed_title.clone(),
                feed_url: feed_url.to_string(),
            }),
        })
        .collect()
}

pub struct RssProvider {
    mode: Mode,
    entries_per_feed: usize,
}

enum Mode {
    /// (feed url, xml body)
    Fixture(Vec<(String, String)>),
    Http {
        client: reqwest::Client,
        feeds: Vec<String>,
    },
}

impl RssProvider {
    pub fn from_fixture(feed_url: &str, xml: &str) -> Self {
        Self::from_fixtures(vec![(feed_url.to_string(), xml.to_string())])
    }

    pub fn from_fixtures(feeds: Vec<(String, String)>) -> Self {
        Self {
            mode: Mode::Fixture(feeds),
            entries_per_feed: RssConfig::default().entries_per_feed,
        }
    }

    pub fn from_http(client: reqwest::Client, cfg: RssConfig) -> Self {
        Self {
            mode: Mode::Http {
                client,
                feeds: cfg.feeds,
            },
            entries_per_feed: cfg.entries_per_feed,
        }
    }

    fn collect(&self, feed_url: &str, body: Result<String>, out: &mut Vec<RawRecord>) {
        match body.and_then(|b| parse_feed(&b)) {
            Ok(feed) => out.extend(records_from_feed(feed, feed_url, self.entries_per_feed)),
            Err(e) => skip_sub_request("News", feed_url, &e),
        }
    }
}

#[async_trait]
impl SourceProvider for RssProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawRecord>> {
        let mut out = Vec::new();
        match &self.mode {
            Mode::Fixture(feeds) => {
                for (url, xml) in feeds {
                    self.collect(url, Ok(xml.clone()), &mut out);
                }
            }
            Mode::Http { client, feeds } => {
                for url in feeds {
                    tracing::debug!(target: "ingest", feed = %url, "parsing feed");
                    let body = get_text(client.get(url.as_str()), "feed").await;
                    self.collect(url, body, &mut out);
                }
            }
        }
        counter!("ingest_records_total", "source" => "news").increment(out.len() as u64);
        Ok(out)
    }

    fn source(&self) -> Source {
        Source::News
    }

    fn name(&self) -> &'static str {
        "News"
    }
}

/// XML only predefines five named entities. Every other HTML name
/// (`&eacute;`, `&copy;`, `&nbsp;`) is decoded to its character before
/// parsing; names HTML doesn't know keep their text as `&amp;name;`.
fn scrub_html_entities_for_xml(s: &str) -> Cow<'_, str> {
    static RE_NAMED: OnceCell<Regex> = OnceCell::new();
    let re = RE_NAMED.get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").expect("entity regex"));

    re.replace_all(s, |caps: &Captures| {
        let name = &caps[1];
        if matches!(name, "amp" | "lt" | "gt" | "quot" | "apos") {
            return caps[0].to_string();
        }
        let decoded = html_escape::decode_html_entities(&caps[0]);
        if decoded == caps[0] {
            return format!("&amp;{name};");
        }
        // &LT; and friends decode to markup characters
        html_escape::encode_safe(&decoded).into_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Tech Daily</title>
    <link>https://daily.test</link>
    <item>
      <title>Chip launch&nbsp;today</title>
      <link>https://daily.test/chip</link>
      <pubDate>Fri, 16 Oct 2026 09:00:00 +0000</pubDate>
      <description><![CDATA[<p>A <b>new</b> chip.</p>]]></description>
      <dc:creator>Jane Doe</dc:creator>
    </item>
    <item>
      <title>No author here</title>
      <link>https://daily.test/second</link>
      <description>plain</description>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="text">Gadget Log</title>
  <entry>
    <title type="html">Phone review</title>
    <link rel="alternate" type="text/html" href="https://gadget.test/phone"/>
    <link rel="replies" href="https://gadget.test/phone#comments"/>
    <id>tag:gadget.test,2026:1</id>
    <published>2026-10-15T12:00:00-04:00</published>
    <updated>2026-10-15T13:00:00-04:00</updated>
    <summary type="html">Short &lt;i&gt;take&lt;/i&gt;</summary>
    <author><name>Sam</name></author>
  </entry>
</feed>"#;

    #[test]
    fn rss_channel_items_parse() {
        let feed = parse_feed(RSS).unwrap();
        assert_eq!(feed.title, "Tech Daily");
        assert_eq!(feed.entries.len(), 2);
        assert_eq!(feed.entries[0].link, "https://daily.test/chip");
        assert_eq!(feed.entries[0].published.as_deref(), Some("Fri, 16 Oct 2026 09:00:00 +0000"));
        assert!(feed.entries[0].summary.contains("<b>new</b>"));
    }

    #[test]
    fn atom_entries_parse() {
        let feed = parse_feed(ATOM).unwrap();
        assert_eq!(feed.title, "Gadget Log");
        let e = &feed.entries[0];
        assert_eq!(e.link, "https://gadget.test/phone");
        assert_eq!(e.published.as_deref(), Some("2026-10-15T12:00:00-04:00"));
        assert_eq!(e.author.as_deref(), Some("Sam"));
        assert_eq!(e.summary, "Short <i>take</i>");
    }

    #[tokio::test]
    async fn author_falls_back_to_feed_title() {
        let recs = RssProvider::from_fixture("https://daily.test/feed", RSS)
            .fetch_latest()
            .await
            .unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[1].author, "Tech Daily");
        assert_eq!(recs[1].engagement, 0.0);
        match &recs[0].meta {
            SourceMeta::News(m) => assert_eq!(m.feed_url, "https://daily.test/feed"),
            other => panic!("unexpected meta {other:?}"),
        }
    }

    #[tokio::test]
    async fn broken_feed_is_skipped() {
        let recs = RssProvider::from_fixtures(vec![
            ("https://bad.test".into(), "<html><body>502</body></html>".into()),
            ("https://gadget.test/atom".into(), ATOM.into()),
        ])
        .fetch_latest()
        .await
        .unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].native_key, "https://gadget.test/phone");
    }

    #[tokio::test]
    async fn html_named_entities_do_not_break_the_feed() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Caf&eacute; &amp; Co&trade;</title>
    <item>
      <title>Caf&eacute; launch</title>
      <link>https://cafe.test/launch</link>
      <description>&copy; 2026 &bogus; &lt;b&gt;x&lt;/b&gt;</description>
    </item>
    <item>
      <title>Second&hellip;</title>
      <link>https://cafe.test/second</link>
    </item>
  </channel>
</rss>"#;
        let recs = RssProvider::from_fixture("https://cafe.test/feed", xml)
            .fetch_latest()
            .await
            .unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].title, "Caf\u{e9} launch");
        assert_eq!(recs[0].body.as_deref(), Some("\u{a9} 2026 &bogus; <b>x</b>"));
        assert_eq!(recs[1].title, "Second\u{2026}");
        assert_eq!(recs[1].author, "Caf\u{e9} & Co\u{2122}");
    }

    #[test]
    fn scrub_keeps_xml_entities_and_escapes_markup() {
        assert_eq!(scrub_html_entities_for_xml("a &amp; b &lt;"), "a &amp; b &lt;");
        assert_eq!(scrub_html_entities_for_xml("&LT;p&GT;"), "&lt;p&gt;");
        assert_eq!(scrub_html_entities_for_xml("&#233; &nope;"), "&#233; &amp;nope;");
    }

    #[test]
    fn entries_are_capped_per_feed() {
        let feed = parse_feed(RSS).unwrap();
        assert_eq!(records_from_feed(feed, "u", 1).len(), 1);
    }
}
