use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;

use crate::item::TrendingItem;
use crate::rank::TractionStats;
use crate::snapshot::SnapshotDocument;
use crate::source::Source;

const DEFAULT_TOP_LIMIT: usize = 20;

/// Latest snapshot, replaced wholesale after each run.
pub type SharedSnapshot = Arc<RwLock<Option<SnapshotDocument>>>;

#[derive(Clone)]
pub struct AppState {
    latest: SharedSnapshot,
}

impl AppState {
    pub fn new(latest: SharedSnapshot) -> Self {
        Self { latest }
    }

    fn read<T>(&self, f: impl FnOnce(&SnapshotDocument) -> T) -> Option<T> {
        match self.latest.read() {
            Ok(g) => g.as_ref().map(f),
            Err(poisoned) => poisoned.into_inner().as_ref().map(f),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/feed", get(feed))
        .route("/feed/top", get(feed_top))
        .route("/stats", get(stats))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn not_ready() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "no snapshot yet").into_response()
}

async fn feed(State(state): State<AppState>) -> Response {
    match state.read(|doc| doc.clone()) {
        Some(doc) => Json(doc).into_response(),
        None => not_ready(),
    }
}

#[derive(Debug, Default, serde::Deserialize)]
struct TopQuery {
    limit: Option<usize>,
    source: Option<String>,
}

async fn feed_top(State(state): State<AppState>, Query(q): Query<TopQuery>) -> Response {
    let filter = match q.source.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => match Source::parse(name) {
            Some(s) => Some(s),
            None => {
                return (StatusCode::BAD_REQUEST, format!("unknown source '{name}'")).into_response()
            }
        },
        None => None,
    };
    let limit = q.limit.unwrap_or(DEFAULT_TOP_LIMIT);

    // items are already in rank order
    let top = state.read(|doc| {
        doc.items
            .iter()
            .filter(|it| filter.map_or(true, |s| it.source == s))
            .take(limit)
            .cloned()
            .collect::<Vec<TrendingItem>>()
    });
    match top {
        Some(items) => Json(items).into_response(),
        None => not_ready(),
    }
}

#[derive(Debug, serde::Serialize)]
struct StatsOut {
    generated_at: DateTime<Utc>,
    total_items: usize,
    sources: BTreeMap<Source, usize>,
    traction_stats: TractionStats,
}

async fn stats(State(state): State<AppState>) -> Response {
    let out = state.read(|doc| StatsOut {
        generated_at: doc.generated_at,
        total_items: doc.total_items,
        sources: doc.sources.clone(),
        traction_stats: doc.traction_stats,
    });
    match out {
        Some(s) => Json(s).into_response(),
        None => not_ready(),
    }
}
