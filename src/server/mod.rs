//! HTTP API module
//!
//! Routes:
//! - `GET /health`
//! - `POST /api/extract` (server-sent progress events)
//! - `POST /api/upload` (raw PDF body)
//! - `GET /api/jobs`, `GET /api/jobs/:id`, `GET /api/items`, `GET /api/stats`

mod error;
mod handlers;

pub use error::ApiError;

use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::storage::SqliteStorage;
use crate::IngestError;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub storage: Arc<Mutex<SqliteStorage>>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, max_upload_bytes: usize) -> Self {
        Self {
            storage: pipeline.storage(),
            pipeline,
            max_upload_bytes,
        }
    }
}

/// Builds the API router
pub fn router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/extract", post(handlers::extract))
        .route("/api/upload", post(handlers::upload).layer(upload_limit))
        .route("/api/jobs", get(handlers::list_jobs))
        .route("/api/jobs/:id", get(handlers::get_job))
        .route("/api/items", get(handlers::list_items))
        .route("/api/stats", get(handlers::stats))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API until the process is stopped
///
/// # Arguments
///
/// * `config` - Configuration (bind address and upload limit are used here)
/// * `pipeline` - The shared pipeline
pub async fn serve(config: &Config, pipeline: Arc<Pipeline>) -> Result<(), IngestError> {
    let state = AppState::new(pipeline, config.server.max_upload_bytes);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!("API server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
