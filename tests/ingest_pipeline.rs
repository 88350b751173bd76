// tests/ingest_pipeline.rs
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use traction_feed::ingest::config::FetcherConfig;
use traction_feed::ingest::types::{RawRecord, SourceProvider};
use traction_feed::ingest::{run_once, run_pipeline};
use traction_feed::source::Source;

struct MockProvider {
    source: Source,
    urls: Vec<&'static str>,
}

#[async_trait]
impl SourceProvider for MockProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawRecord>> {
        Ok(self
            .urls
            .iter()
            .map(|u| {
                let mut r = RawRecord::new(*u, "  Hello&nbsp;&nbsp;world ", *u);
                r.body = Some("<p>Body &amp; more</p>".into());
                r
            })
            .collect())
    }
    fn source(&self) -> Source {
        self.source
    }
    fn name(&self) -> &'static str {
        "MockProvider"
    }
}

struct FailingProvider;

#[async_trait]
impl SourceProvider for FailingProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawRecord>> {
        bail!("upstream returned 503")
    }
    fn source(&self) -> Source {
        Source::YouTube
    }
    fn name(&self) -> &'static str {
        "FailingProvider"
    }
}

struct SlowProvider;

#[async_trait]
impl SourceProvider for SlowProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawRecord>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(vec![RawRecord::new("late", "late", "https://late.test")])
    }
    fn source(&self) -> Source {
        Source::GitHub
    }
    fn name(&self) -> &'static str {
        "SlowProvider"
    }
}

struct PanickingProvider;

#[async_trait]
impl SourceProvider for PanickingProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawRecord>> {
        panic!("adapter bug")
    }
    fn source(&self) -> Source {
        Source::Reddit
    }
    fn name(&self) -> &'static str {
        "PanickingProvider"
    }
}

fn mock(source: Source, urls: Vec<&'static str>) -> Arc<dyn SourceProvider> {
    Arc::new(MockProvider { source, urls })
}

#[tokio::test]
async fn smoke_pipeline_runs_and_outputs() {
    let providers = vec![mock(Source::News, vec!["https://example.test/x"])];
    let (doc, report) =
        run_pipeline(&providers, &FetcherConfig::default(), &FetcherConfig::default().scorer()).await;
    assert_eq!(doc.total_items, 1);
    assert_eq!(report.raw_records, 1);
    let it = &doc.items[0];
    assert_eq!(it.title, "Hello world");
    assert_eq!(it.summary, "Body & more");
    assert_eq!(it.source, Source::News);
}

#[tokio::test]
async fn failures_do_not_abort_the_run() {
    let providers: Vec<Arc<dyn SourceProvider>> = vec![
        Arc::new(FailingProvider),
        Arc::new(PanickingProvider),
        mock(Source::HackerNews, vec!["https://a.test", "https://b.test"]),
    ];
    let batches = run_once(&providers, 5, Duration::from_secs(5)).await;

    let total: usize = batches.iter().map(|b| b.records.len()).sum();
    assert_eq!(total, 2);
    // the panicked task has no batch; the failing one has an empty batch
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].source, Source::HackerNews);
    assert_eq!(batches[1].source, Source::YouTube);
    assert!(batches[1].records.is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_provider_is_cut_off_by_timeout() {
    let providers: Vec<Arc<dyn SourceProvider>> =
        vec![Arc::new(SlowProvider), mock(Source::Reddit, vec!["https://r.test"])];
    let batches = run_once(&providers, 1, Duration::from_secs(2)).await;

    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].source, Source::Reddit);
    assert_eq!(batches[0].records.len(), 1);
    assert_eq!(batches[1].source, Source::GitHub);
    assert!(batches[1].records.is_empty());
}

#[tokio::test]
async fn cross_source_duplicates_are_dropped() {
    let providers = vec![
        mock(Source::Reddit, vec!["https://shared.test/story", "https://r.test/only"]),
        mock(Source::HackerNews, vec!["https://shared.test/story"]),
    ];
    let cfg = FetcherConfig::default();
    let (doc, report) = run_pipeline(&providers, &cfg, &cfg.scorer()).await;
    assert_eq!(report.duplicates, 1);
    assert_eq!(doc.total_items, 2);
    let shared = doc
        .items
        .iter()
        .find(|i| i.url == "https://shared.test/story")
        .unwrap();
    assert_eq!(shared.source, Source::HackerNews);
}
