//! Buffered (full-completion) analysis entry point.
//!
//! The simpler of the two delivery modes: wait for the whole completion,
//! return one [`AnalysisOutput`]. Use [`crate::stream::analyze_stream`] when
//! the caller should see text as it is generated. Both modes run the same
//! validate → extract → prompt → complete sequence and differ only in how
//! the completion is delivered.

use crate::config::AnalysisConfig;
use crate::error::GapScanError;
use crate::output::{AnalysisOutput, AnalysisStats};
use crate::pipeline::extract::{self, UploadedDocument};
use crate::pipeline::llm::{self, CompletionOptions};
use crate::prompts;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

/// Analyse an uploaded document and return the full result at once.
///
/// # Errors
/// * [`GapScanError::UnsupportedMediaType`] — declared type is not
///   `application/pdf`
/// * [`GapScanError::Extraction`] — the bytes are not a parseable PDF
/// * [`GapScanError::EmptyDocument`] — no text after trimming
/// * [`GapScanError::ProviderNotConfigured`] / [`GapScanError::Upstream`] —
///   completion-side failures; never retried
pub async fn analyze(
    document: UploadedDocument,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, GapScanError> {
    let total_start = Instant::now();
    info!(bytes = document.bytes.len(), "starting buffered analysis");

    // ── Validate + extract ───────────────────────────────────────────────
    let extract_start = Instant::now();
    let text = extract_stage(&document).await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    debug!(chars = text.len(), "extraction finished");

    // ── Build prompt ─────────────────────────────────────────────────────
    let prompt = prompts::build_prompt(
        &text,
        config.case_studies(),
        config.system_prompt.as_deref(),
    );

    // ── Complete ─────────────────────────────────────────────────────────
    let provider = llm::resolve_provider(config)?;
    let options = CompletionOptions::from_config(config);
    let llm_start = Instant::now();
    let completion = timeout(
        Duration::from_secs(config.api_timeout_secs),
        provider.complete(&prompt, &options),
    )
    .await
    .map_err(|_| GapScanError::Upstream {
        detail: format!(
            "completion did not finish within {}s",
            config.api_timeout_secs
        ),
    })??;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    let text_length = text.chars().count();
    let stats = AnalysisStats {
        extracted_chars: text_length,
        prompt_chars: prompt.system.chars().count() + prompt.user.chars().count(),
        input_tokens: completion.input_tokens,
        output_tokens: completion.output_tokens,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        extract_duration_ms,
        llm_duration_ms,
    };

    info!(
        analysis_chars = completion.text.len(),
        total_ms = stats.total_duration_ms,
        "analysis complete"
    );

    Ok(AnalysisOutput {
        analysis: completion.text,
        text_length,
        stats,
    })
}

/// Shared front half of both delivery modes: media-type check, extraction
/// under `spawn_blocking`, and the empty-document check.
///
/// Runs before any provider is resolved, so an invalid upload never reaches
/// the completion API.
pub(crate) async fn extract_stage(document: &UploadedDocument) -> Result<String, GapScanError> {
    if !document.is_pdf() {
        return Err(GapScanError::UnsupportedMediaType {
            got: document.media_type.clone(),
        });
    }

    let bytes = document.bytes.clone();
    let text = tokio::task::spawn_blocking(move || extract::extract_text(&bytes))
        .await
        .map_err(|e| GapScanError::Internal(format!("extraction task failed: {e}")))??;

    if text.trim().is_empty() {
        return Err(GapScanError::EmptyDocument);
    }
    Ok(text)
}
