//! Pipeline stages for document analysis.
//!
//! Each submodule implements one transformation step, independently testable.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ prompt ──▶ llm ──▶ relay
//! (lopdf)    (crate::prompts)  (completion API)  (framed events)
//! ```
//!
//! 1. [`extract`] — parse the uploaded PDF to normalised text; runs in
//!    `spawn_blocking` because parsing is CPU-bound
//! 2. [`llm`]     — drive the completion call, buffered or streaming; the
//!    only stage with network I/O
//! 3. [`relay`]   — re-chunk streamed fragments into client events under a
//!    wall-clock deadline

pub mod extract;
pub mod llm;
pub mod relay;
