// src/api.rs
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;

use crate::pipeline::Pipeline;

pub const WELCOME_MESSAGE: &str = "Welcome to the News Summarizer API!";
pub const ERROR_MESSAGE: &str = "Erro ao buscar notícias.";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/noticias", get(noticias))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn welcome() -> &'static str {
    WELCOME_MESSAGE
}

/// Runs collect + summarize synchronously and answers with the summary text.
async fn noticias(State(state): State<AppState>) -> impl IntoResponse {
    match state.pipeline.run().await {
        Ok(summary) => (StatusCode::OK, summary),
        Err(e) => {
            tracing::error!(error = %e, kind = e.kind().as_str(), "on-demand news run failed");
            (StatusCode::INTERNAL_SERVER_ERROR, ERROR_MESSAGE.to_string())
        }
    }
}
