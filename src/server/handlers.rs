//! Request handlers and the HTTP error mapping.

use crate::error::GapScanError;
use crate::pipeline::extract::UploadedDocument;
use crate::server::AppState;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

/// Liveness response for `GET /health`.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "gapscan",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Buffered response body for `POST /api/analyze`.
#[derive(Serialize)]
pub struct AnalysisResponse {
    pub analysis: String,
    #[serde(rename = "textLength")]
    pub text_length: usize,
}

/// `POST /api/analyze` — run the full analysis, answer with one JSON blob.
pub async fn analyze_buffered(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalysisResponse>, AppError> {
    let document = read_document(multipart).await?;
    let output = crate::analyze::analyze(document, &state.config).await?;
    Ok(Json(AnalysisResponse {
        analysis: output.analysis,
        text_length: output.text_length,
    }))
}

/// `POST /api/analyze/stream` — stream the analysis as SSE frames.
///
/// Each relay event becomes one `data:` frame; the stream ends with
/// `data: {"done":true}`. Errors raised before the stream starts map to
/// plain JSON error responses; a relay error after streaming has begun
/// terminates the connection in an error state, leaving whatever was already
/// delivered on the client side.
pub async fn analyze_stream(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let document = read_document(multipart).await?;
    let events = crate::stream::analyze_stream(document, &state.config).await?;

    let sse = events.map(|item| {
        item.map_err(axum::Error::new)
            .and_then(|event| Event::default().json_data(&event))
    });

    Ok(Sse::new(sse).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

/// Pull the `file` field out of the multipart body.
async fn read_document(mut multipart: Multipart) -> Result<UploadedDocument, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let media_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            return Ok(UploadedDocument::new(bytes, media_type));
        }
    }
    Err(AppError(GapScanError::MissingFile))
}

// ── Error mapping ────────────────────────────────────────────────────────

/// Wrapper that renders [`GapScanError`] as the wire error format.
#[derive(Debug)]
pub struct AppError(pub GapScanError);

impl From<GapScanError> for AppError {
    fn from(err: GapScanError) -> Self {
        AppError(err)
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError(GapScanError::Internal(format!("multipart: {err}")))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = self.0;
        if err.is_client_error() {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        } else {
            tracing::error!(error = %err, "analysis request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Error processing request",
                    "details": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}
