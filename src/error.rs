//! Error types for the gapscan library.
//!
//! A single request moves through upload validation, text extraction, and the
//! completion call; [`GapScanError`] covers each stage. No variant is retried
//! internally — every error is terminal for the request that raised it.
//!
//! The split that matters to callers is client-fixable vs. everything else:
//! [`GapScanError::is_client_error`] returns `true` for errors the uploader
//! can correct (no file, wrong media type, a PDF without text), which the
//! HTTP layer maps to `400`. All remaining variants map to `500`.

use thiserror::Error;

/// All errors returned by the gapscan library.
#[derive(Debug, Error)]
pub enum GapScanError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// The request carried no `file` field.
    #[error("No file provided")]
    MissingFile,

    /// The uploaded file declared a media type other than `application/pdf`.
    #[error("File must be a PDF (got media type '{got}')")]
    UnsupportedMediaType { got: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The binary could not be parsed as a PDF.
    #[error("Failed to extract text from PDF: {detail}")]
    Extraction { detail: String },

    /// The PDF parsed but yielded no text after trimming whitespace.
    /// Typical for scanned (image-only) documents.
    #[error("No text content found in PDF")]
    EmptyDocument,

    // ── Completion errors ─────────────────────────────────────────────────
    /// No completion provider is available (missing API key, no injection).
    #[error("Completion provider is not configured.\n{hint}")]
    ProviderNotConfigured { hint: String },

    /// The completion API failed: network, auth, rate limit, or a malformed
    /// response. Never retried.
    #[error("Completion API error: {detail}")]
    Upstream { detail: String },

    /// The streaming relay hit its wall-clock ceiling before the upstream
    /// completion finished.
    #[error("Analysis stream timed out after {secs}s")]
    StreamTimeout { secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GapScanError {
    /// Whether the uploader can fix this error by changing the request.
    ///
    /// The HTTP layer maps these to `400`; everything else becomes `500`.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GapScanError::MissingFile
                | GapScanError::UnsupportedMediaType { .. }
                | GapScanError::Extraction { .. }
                | GapScanError::EmptyDocument
        )
    }

    /// Wrap any displayable upstream failure.
    pub(crate) fn upstream(err: impl std::fmt::Display) -> Self {
        GapScanError::Upstream {
            detail: err.to_string(),
        }
    }
}
