//! PDF text extraction: uploaded binary → normalised plain text.
//!
//! Extraction is page-ordered: each page's text fragments are joined with
//! single spaces, and pages are joined with `\n`. The page boundary newline
//! is the only structure the rest of the pipeline relies on, so the
//! normalisation collapses every other whitespace run.
//!
//! Parsing is CPU-bound; callers run [`extract_text`] under
//! `tokio::task::spawn_blocking`.

use crate::error::GapScanError;
use bytes::Bytes;
use lopdf::Document;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// The only media type accepted for uploads.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// An uploaded file, as received from the client. Lives for one request and
/// is consumed by extraction.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Raw file content.
    pub bytes: Bytes,
    /// Media type declared by the client.
    pub media_type: String,
}

impl UploadedDocument {
    pub fn new(bytes: impl Into<Bytes>, media_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
        }
    }

    /// Whether the client declared the upload as a PDF.
    pub fn is_pdf(&self) -> bool {
        self.media_type == PDF_MEDIA_TYPE
    }
}

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Extract the full text of a PDF, pages joined with `\n`.
///
/// Fails with [`GapScanError::Extraction`] when the bytes are not a parseable
/// PDF. An extractable-but-textless document returns an empty string; the
/// empty-document check belongs to the caller, which also knows whether the
/// text survived trimming.
pub fn extract_text(bytes: &[u8]) -> Result<String, GapScanError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        return Err(GapScanError::Extraction {
            detail: "missing %PDF header".into(),
        });
    }

    let doc = Document::load_mem(bytes).map_err(|e| GapScanError::Extraction {
        detail: e.to_string(),
    })?;

    if doc.is_encrypted() {
        return Err(GapScanError::Extraction {
            detail: "PDF is encrypted".into(),
        });
    }

    // get_pages is ordered by page number, which preserves document order.
    let mut pages = Vec::new();
    for (page_num, _object_id) in doc.get_pages() {
        let raw = doc
            .extract_text(&[page_num])
            .map_err(|e| GapScanError::Extraction {
                detail: format!("page {page_num}: {e}"),
            })?;
        pages.push(normalize_page(&raw));
    }

    debug!("extracted {} pages", pages.len());
    Ok(pages.join("\n"))
}

/// Collapse intra-page whitespace runs to single spaces.
fn normalize_page(raw: &str) -> String {
    WHITESPACE_RUN.replace_all(raw.trim(), " ").into_owned()
}
