//! HTTP surface: router construction and serving.
//!
//! One state type, three routes. Analysis behaviour is owned entirely by the
//! shared [`AnalysisConfig`]; handlers translate between HTTP and the
//! library entry points and nothing else.

pub mod handlers;

use crate::config::AnalysisConfig;
use crate::error::GapScanError;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AnalysisConfig>,
}

/// Build the application router.
///
/// * `GET  /health`             — liveness probe
/// * `POST /api/analyze`        — buffered analysis, JSON response
/// * `POST /api/analyze/stream` — streamed analysis, `text/event-stream`
pub fn router(config: Arc<AnalysisConfig>) -> Router {
    let body_limit = config.max_upload_bytes;
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/analyze", post(handlers::analyze_buffered))
        .route("/api/analyze/stream", post(handlers::analyze_stream))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { config })
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: &str, config: Arc<AnalysisConfig>) -> Result<(), GapScanError> {
    let app = router(config);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| GapScanError::Internal(format!("failed to bind {addr}: {e}")))?;
    info!("listening on {addr}");
    axum::serve(listener, app)
        .await
        .map_err(|e| GapScanError::Internal(format!("server error: {e}")))
}
