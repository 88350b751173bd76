// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod dates;
pub mod dedup;
pub mod ids;
pub mod ingest;
pub mod item;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod rank;
pub mod scoring;
pub mod snapshot;
pub mod source;
pub mod source_weights;
pub mod text;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::dedup::deduplicate;
pub use crate::ids::make_id;
pub use crate::item::{SourceMeta, TrendingItem};
pub use crate::pipeline::{run_core, PipelineSettings, RunReport};
pub use crate::rank::{rank, TractionStats};
pub use crate::scoring::traction_score;
pub use crate::snapshot::SnapshotDocument;
pub use crate::source::Source;
