// tests/metrics.rs
//
// One recorder per process, so this file holds a single test.

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;
use traction_feed::ingest::config::FetcherConfig;
use traction_feed::ingest::providers::{hackernews::HackerNewsProvider, reddit::RedditProvider};
use traction_feed::ingest::run_pipeline;
use traction_feed::ingest::types::SourceProvider;
use traction_feed::metrics::{Metrics, REFRESH_INTERVAL_GAUGE};

const HN: &str = r#"[
    {"id": 1, "type": "story", "title": "One", "url": "https://a.test/1", "score": 10, "time": 1760000000},
    {"id": 2, "type": "story", "title": "Two", "url": "https://a.test/2", "score": 20, "time": 1760000000}
]"#;

#[tokio::test]
async fn metrics_endpoint_contains_pipeline_series() {
    let metrics = Metrics::init(Some(900)).expect("recorder");

    let providers: Vec<Arc<dyn SourceProvider>> = vec![
        Arc::new(HackerNewsProvider::from_fixture(HN)),
        // same story again from another source, plus a broken listing
        Arc::new(RedditProvider::from_fixtures(vec![
            (
                "rust".into(),
                r#"{"data": {"children": [{"data": {"id": "x", "title": "One", "url": "https://a.test/1"}}]}}"#
                    .into(),
            ),
            ("broken".into(), "not json".into()),
        ])),
    ];
    let cfg = FetcherConfig::default();
    let (doc, report) = run_pipeline(&providers, &cfg, &cfg.scorer()).await;
    assert_eq!(doc.total_items, 2);
    assert_eq!(report.duplicates, 1);

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap(); // 1 MiB
    let text = String::from_utf8(body.to_vec()).unwrap();

    let gauge_line = text.lines().find(|l| l.starts_with(REFRESH_INTERVAL_GAUGE));
    assert!(
        gauge_line.is_some_and(|l| matches!(l.split_whitespace().last(), Some("900") | Some("900.0"))),
        "refresh gauge not set to 900\n{text}"
    );
    for needle in [
        "ingest_records_total",
        "ingest_provider_errors_total",
        "ingest_dedup_total",
        "ingest_runs_total",
        "pipeline_items_total",
        "pipeline_last_run_ts",
    ] {
        assert!(
            text.contains(needle),
            "metrics exposition missing '{needle}'\n{text}"
        );
    }
}
