//! Prompt construction for the compliance-gap analysis.
//!
//! Centralising the prompt here keeps the required output structure in one
//! place and lets unit tests assert on it without calling a model. Callers
//! can override the system prompt via
//! [`crate::config::AnalysisConfig::system_prompt`]; the constants here are
//! used when no override is provided.

/// The six analysis domains the model is allowed to report under.
///
/// The system prompt enumerates exactly these; the model is instructed to
/// include only the ones relevant to the document.
pub const ANALYSIS_DOMAINS: [&str; 6] = [
    "IP Management",
    "Informed Consent",
    "Study Staff & Training",
    "Protocol Compliance",
    "Data Management",
    "Safety Reporting",
];

/// The three top-level sections every analysis must contain, in order.
pub const OUTPUT_SECTIONS: [&str; 3] = ["Key Findings", "Analysis by Domain", "Recommendations"];

/// Default system prompt for the gap analysis.
///
/// Used when `AnalysisConfig::system_prompt` is `None`.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert document reviewer specializing in GCP (Good Clinical Practice) inspections and clinical trial documentation.
Analyze the provided document and identify gaps based on the case studies.

Format your response in markdown with the following sections:

# Key Findings
- Use markdown bullet points for gaps and non-compliances

# Analysis by Domain
## IP Management
## Informed Consent
## Study Staff & Training
## Protocol Compliance
## Data Management
## Safety Reporting
(Include only relevant domains)

# Recommendations
- Use markdown bullet points for actionable steps
- Include priority levels in bold

Use markdown features like **bold**, *italic*, `code`, and > quotes for emphasis."#;

/// Built-in reference corpus, shipped with the crate.
///
/// Replaceable per request via `AnalysisConfig::case_studies`.
pub const DEFAULT_CASE_STUDIES: &str = include_str!("../assets/case_studies.md");

/// A fully assembled completion request payload. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPrompt {
    /// The reviewer instruction defining the required output structure.
    pub system: String,
    /// Document text plus reference case studies.
    pub user: String,
}

/// Assemble the prompt for one document.
///
/// The system instruction is fixed (or the caller's override); the user
/// instruction interpolates the extracted document text and the reference
/// corpus. Document content always comes first so the model reads it before
/// the precedents.
pub fn build_prompt(
    document_text: &str,
    case_studies: &str,
    system_override: Option<&str>,
) -> AnalysisPrompt {
    AnalysisPrompt {
        system: system_override.unwrap_or(DEFAULT_SYSTEM_PROMPT).to_string(),
        user: format!(
            "Document content: {document_text}\n\n\
             Reference Case Studies:\n{case_studies}\n\n\
             Please analyze the document, identify gaps, and provide next steps \
             based on the case studies and GCP requirements."
        ),
    }
}
