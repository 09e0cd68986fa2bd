// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod scheduler;
pub mod summarize;

use std::sync::Arc;

// ---- Re-exports for stable public API ----
pub use crate::config::AppConfig;
pub use crate::error::{FailureKind, PipelineError};
pub use crate::pipeline::{Pipeline, FALLBACK_MESSAGE};

/// HTTP router over a shared pipeline: `GET /` and `GET /noticias`.
pub fn router(pipeline: Arc<Pipeline>) -> axum::Router {
    api::create_router(api::AppState { pipeline })
}
