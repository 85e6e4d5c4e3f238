//! Output types for buffered analysis.

use serde::Serialize;

/// The result of a buffered (non-streaming) analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    /// The full generated analysis, markdown-formatted.
    pub analysis: String,
    /// Character count of the extracted document text that was analysed.
    pub text_length: usize,
    /// Timing and usage statistics for the run.
    pub stats: AnalysisStats,
}

/// Statistics for one analysis run.
///
/// Token counts are present only when the provider reports usage; injected
/// test providers usually do not.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisStats {
    /// Characters of text extracted from the PDF.
    pub extracted_chars: usize,
    /// Characters in the assembled prompt (system + user).
    pub prompt_chars: usize,
    /// Prompt tokens consumed, as reported by the provider.
    pub input_tokens: Option<u32>,
    /// Completion tokens generated, as reported by the provider.
    pub output_tokens: Option<u32>,
    /// End-to-end wall-clock time.
    pub total_duration_ms: u64,
    /// Time spent parsing the PDF and normalising text.
    pub extract_duration_ms: u64,
    /// Time spent waiting on the completion API.
    pub llm_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_serialise_without_usage() {
        let stats = AnalysisStats {
            extracted_chars: 10,
            total_duration_ms: 42,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["extracted_chars"], 10);
        assert_eq!(json["input_tokens"], serde_json::Value::Null);
    }
}
