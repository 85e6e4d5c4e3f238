//! Streaming analysis entry point.
//!
//! Returns an [`EventStream`] that yields the analysis incrementally,
//! terminated by a single `done` marker. Preconditions (media type,
//! parseability, non-empty text) are checked before the stream is returned,
//! so callers either get a plain error up front or a stream that has already
//! started — never a stream that fails validation mid-flight.

use crate::analyze::extract_stage;
use crate::config::AnalysisConfig;
use crate::error::GapScanError;
use crate::pipeline::extract::UploadedDocument;
use crate::pipeline::llm::{self, CompletionOptions};
use crate::pipeline::relay::{self, EventStream};
use crate::prompts;
use tracing::info;

/// Analyse an uploaded document, streaming the result as framed events.
///
/// Event order matches upstream arrival order; concatenating every `content`
/// payload reproduces exactly the text that [`crate::analyze::analyze`]
/// would have returned for the same completion. The stream ends with one
/// `done` event, or with an error item (timeout, upstream failure) and no
/// `done`.
pub async fn analyze_stream(
    document: UploadedDocument,
    config: &AnalysisConfig,
) -> Result<EventStream, GapScanError> {
    info!(bytes = document.bytes.len(), "starting streaming analysis");

    let text = extract_stage(&document).await?;
    let prompt = prompts::build_prompt(
        &text,
        config.case_studies(),
        config.system_prompt.as_deref(),
    );

    let provider = llm::resolve_provider(config)?;
    let options = CompletionOptions::from_config(config);
    let fragments = provider.complete_stream(&prompt, &options).await?;

    Ok(relay::relay(
        fragments,
        config.chunking,
        config.stream_timeout_secs,
    ))
}
