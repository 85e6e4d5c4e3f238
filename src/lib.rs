//! # gapscan
//!
//! Compliance-gap analysis of clinical trial documents using LLMs.
//!
//! Upload a PDF, get back a structured GCP gap analysis: the document's text
//! is extracted, combined with a corpus of reference inspection case studies,
//! and sent to a chat-completion endpoint whose answer is relayed to the
//! caller — streamed event-by-event for live rendering, or buffered as one
//! result.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Extract  parse to text via lopdf (CPU-bound, spawn_blocking)
//!  ├─ 2. Prompt   fixed reviewer instruction + document + case studies
//!  ├─ 3. Complete single chat-completion call, buffered or streaming
//!  └─ 4. Relay    re-chunk fragments, frame as events, deadline-guarded
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gapscan::{analyze, AnalysisConfig, UploadedDocument, PDF_MEDIA_TYPE};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider resolved from OPENAI_API_KEY
//!     let config = AnalysisConfig::default();
//!     let bytes = std::fs::read("protocol.pdf")?;
//!     let document = UploadedDocument::new(bytes, PDF_MEDIA_TYPE);
//!     let output = analyze(document, &config).await?;
//!     println!("{}", output.analysis);
//!     Ok(())
//! }
//! ```
//!
//! Or run the bundled HTTP service and POST multipart uploads to it:
//!
//! ```text
//! gapscan serve --addr 0.0.0.0:8080
//! curl -N -F file=@protocol.pdf;type=application/pdf \
//!     http://localhost:8080/api/analyze/stream
//! ```
//!
//! ## Delivery Modes
//!
//! [`analyze`] and [`analyze_stream`] are the same operation with two
//! transports. The streamed variant emits `{"content": "…"}` events whose
//! concatenation equals the buffered result, terminated by one
//! `{"done": true}` marker; a hard wall-clock deadline (default 4 minutes)
//! guards against an upstream that never finishes.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `gapscan` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::analyze;
pub use config::{AnalysisConfig, AnalysisConfigBuilder, ChunkGranularity};
pub use error::GapScanError;
pub use output::{AnalysisOutput, AnalysisStats};
pub use pipeline::extract::{UploadedDocument, PDF_MEDIA_TYPE};
pub use pipeline::llm::{
    Completion, CompletionOptions, CompletionProvider, FragmentStream, OpenAiProvider,
};
pub use pipeline::relay::{EventStream, StreamEvent};
pub use prompts::{AnalysisPrompt, ANALYSIS_DOMAINS, OUTPUT_SECTIONS};
pub use stream::analyze_stream;
