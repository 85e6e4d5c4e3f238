//! Configuration for document analysis.
//!
//! All analysis behaviour is controlled through [`AnalysisConfig`], built via
//! its [`AnalysisConfigBuilder`]. One struct holds every knob so the server,
//! the CLI, and tests all share the same surface, and a config can be logged
//! to explain why two runs behaved differently.

use crate::error::GapScanError;
use crate::pipeline::llm::CompletionProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for a compliance-gap analysis.
///
/// Built via [`AnalysisConfig::builder()`] or [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use gapscan::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .model("gpt-4o-mini")
///     .temperature(0.2)
///     .max_tokens(4000)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Completion model identifier. Default: "gpt-4o-mini".
    pub model: String,

    /// Sampling temperature for the completion. Default: 0.0.
    ///
    /// The analysis is a faithfulness task, not a creative one; values above
    /// 0.7 make the findings drift from what the document actually says.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4000.
    ///
    /// A full analysis of a dense protocol runs 1500–3000 output tokens.
    /// Setting this too low truncates the Recommendations section first.
    pub max_tokens: u32,

    /// Ceiling on a buffered completion call, in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Hard wall-clock ceiling on a streaming analysis, in seconds.
    /// Default: 240.
    ///
    /// Measured from relay start, not from the last fragment — a stream that
    /// keeps trickling tokens is still cut off when the ceiling passes.
    pub stream_timeout_secs: u64,

    /// How upstream fragments are re-chunked into client events.
    /// Default: [`ChunkGranularity::Characters`].
    pub chunking: ChunkGranularity,

    /// Reference case studies interpolated into the prompt.
    /// If `None`, the built-in corpus is used.
    pub case_studies: Option<String>,

    /// Custom system prompt. If `None`, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Pre-constructed completion provider. Takes precedence over the
    /// `OPENAI_API_KEY` environment lookup. Mainly for tests.
    pub provider: Option<Arc<dyn CompletionProvider>>,

    /// Upper bound on uploaded request bodies, in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 4000,
            api_timeout_secs: 120,
            stream_timeout_secs: 240,
            chunking: ChunkGranularity::default(),
            case_studies: None,
            system_prompt: None,
            provider: None,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("stream_timeout_secs", &self.stream_timeout_secs)
            .field("chunking", &self.chunking)
            .field("case_studies", &self.case_studies.as_ref().map(String::len))
            .field("system_prompt", &self.system_prompt.as_ref().map(String::len))
            .field(
                "provider",
                &self.provider.as_ref().map(|_| "<dyn CompletionProvider>"),
            )
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// The reference corpus for this config: the override if one was set,
    /// the built-in case studies otherwise.
    pub fn case_studies(&self) -> &str {
        self.case_studies
            .as_deref()
            .unwrap_or(crate::prompts::DEFAULT_CASE_STUDIES)
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn stream_timeout_secs(mut self, secs: u64) -> Self {
        self.config.stream_timeout_secs = secs;
        self
    }

    pub fn chunking(mut self, granularity: ChunkGranularity) -> Self {
        self.config.chunking = granularity;
        self
    }

    pub fn case_studies(mut self, text: impl Into<String>) -> Self {
        self.config.case_studies = Some(text.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes.max(1024);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, GapScanError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(GapScanError::InvalidConfig(
                "Model identifier must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(GapScanError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.stream_timeout_secs == 0 || c.api_timeout_secs == 0 {
            return Err(GapScanError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How an upstream completion fragment is split into outbound events.
///
/// `Characters` reproduces a typewriter-style rendering in the browser:
/// every character becomes its own event. `Fragments` forwards the upstream
/// chunks as received, which is cheaper on the wire. Either way event order
/// matches arrival order and the concatenated content is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChunkGranularity {
    /// One event per character (default).
    #[default]
    Characters,
    /// One event per upstream fragment.
    Fragments,
}

impl ChunkGranularity {
    /// Split one upstream fragment into event payloads.
    pub fn split(&self, fragment: &str) -> Vec<String> {
        match self {
            ChunkGranularity::Characters => {
                fragment.chars().map(|c| c.to_string()).collect()
            }
            ChunkGranularity::Fragments => {
                if fragment.is_empty() {
                    Vec::new()
                } else {
                    vec![fragment.to_string()]
                }
            }
        }
    }
}
