//! Completion-provider seam and the OpenAI implementation.
//!
//! The pipeline talks to [`CompletionProvider`], never to a concrete client.
//! Tests inject scripted providers through
//! [`crate::config::AnalysisConfigBuilder::provider`]; production resolves an
//! [`OpenAiProvider`] from the environment. Both delivery modes are on the
//! trait because they are the same operation with different transports:
//! [`CompletionProvider::complete`] waits for the whole completion,
//! [`CompletionProvider::complete_stream`] yields fragments as the API emits
//! them.

use crate::config::AnalysisConfig;
use crate::error::GapScanError;
use crate::prompts::AnalysisPrompt;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use futures::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::debug;

/// Incremental text fragments from a streaming completion, in arrival order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, GapScanError>> + Send>>;

/// Sampling parameters for one completion call, derived from the config.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionOptions {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// A finished buffered completion.
#[derive(Debug, Clone)]
pub struct Completion {
    /// The full generated text.
    pub text: String,
    /// Prompt tokens, when the API reports usage.
    pub input_tokens: Option<u32>,
    /// Completion tokens, when the API reports usage.
    pub output_tokens: Option<u32>,
}

/// A chat-completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run the prompt to completion and return the full text.
    async fn complete(
        &self,
        prompt: &AnalysisPrompt,
        options: &CompletionOptions,
    ) -> Result<Completion, GapScanError>;

    /// Run the prompt in streaming mode, yielding text fragments as they
    /// arrive. The stream ends when the upstream completion finishes; an
    /// `Err` item is terminal.
    async fn complete_stream(
        &self,
        prompt: &AnalysisPrompt,
        options: &CompletionOptions,
    ) -> Result<FragmentStream, GapScanError>;
}

/// Resolve the provider for a request.
///
/// An injected provider wins; otherwise `OPENAI_API_KEY` from the environment
/// configures an [`OpenAiProvider`].
pub fn resolve_provider(
    config: &AnalysisConfig,
) -> Result<Arc<dyn CompletionProvider>, GapScanError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(Arc::new(OpenAiProvider::with_api_key(key))),
        _ => Err(GapScanError::ProviderNotConfigured {
            hint: "Set OPENAI_API_KEY, or inject a provider via \
                   AnalysisConfigBuilder::provider."
                .into(),
        }),
    }
}

// ── OpenAI ───────────────────────────────────────────────────────────────

/// Completion provider backed by the OpenAI chat-completions API.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
}

impl OpenAiProvider {
    /// Client configured from the environment (`OPENAI_API_KEY`).
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(OpenAIConfig::new().with_api_key(key)),
        }
    }

    /// Full control over the client config, e.g. an OpenAI-compatible
    /// `api_base`.
    pub fn with_config(config: OpenAIConfig) -> Self {
        Self {
            client: Client::with_config(config),
        }
    }

    fn build_request(
        prompt: &AnalysisPrompt,
        options: &CompletionOptions,
    ) -> Result<CreateChatCompletionRequest, GapScanError> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(prompt.system.as_str())
            .build()
            .map_err(|e| GapScanError::Internal(format!("system message: {e}")))?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.user.as_str())
            .build()
            .map_err(|e| GapScanError::Internal(format!("user message: {e}")))?;

        CreateChatCompletionRequestArgs::default()
            .model(options.model.as_str())
            .temperature(options.temperature)
            .max_completion_tokens(options.max_tokens)
            .messages([system.into(), user.into()])
            .build()
            .map_err(|e| GapScanError::Internal(format!("completion request: {e}")))
    }
}

impl Default for OpenAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(
        &self,
        prompt: &AnalysisPrompt,
        options: &CompletionOptions,
    ) -> Result<Completion, GapScanError> {
        let request = Self::build_request(prompt, options)?;
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(GapScanError::upstream)?;

        let (input_tokens, output_tokens) = match response.usage {
            Some(ref usage) => (Some(usage.prompt_tokens), Some(usage.completion_tokens)),
            None => (None, None),
        };
        debug!(
            model = %options.model,
            input_tokens, output_tokens, "buffered completion finished"
        );

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GapScanError::Upstream {
                detail: "completion response contained no content".into(),
            })?;

        Ok(Completion {
            text,
            input_tokens,
            output_tokens,
        })
    }

    async fn complete_stream(
        &self,
        prompt: &AnalysisPrompt,
        options: &CompletionOptions,
    ) -> Result<FragmentStream, GapScanError> {
        let request = Self::build_request(prompt, options)?;
        let stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(GapScanError::upstream)?;

        // Chunks without delta content (role preamble, finish markers) are
        // dropped here so the relay only ever sees text.
        let fragments = stream.filter_map(|chunk| async move {
            match chunk {
                Ok(response) => response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content)
                    .filter(|content| !content.is_empty())
                    .map(Ok),
                Err(e) => Some(Err(GapScanError::upstream(e))),
            }
        });

        Ok(Box::pin(fragments))
    }
}
