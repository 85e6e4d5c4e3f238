//! End-to-end tests for the analysis pipeline and the HTTP surface.
//!
//! No live completion calls: scripted providers are injected through
//! `AnalysisConfigBuilder::provider`, the same seam the server uses, so the
//! full upload → extract → prompt → relay path runs against deterministic
//! output.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use futures::{stream, StreamExt};
use gapscan::{
    AnalysisConfig, AnalysisPrompt, Completion, CompletionOptions, CompletionProvider,
    FragmentStream, GapScanError, StreamEvent, UploadedDocument, PDF_MEDIA_TYPE,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test providers ───────────────────────────────────────────────────────

/// Yields a fixed fragment script; counts calls and records the last prompt.
struct ScriptedProvider {
    fragments: Vec<String>,
    calls: AtomicUsize,
    last_user_prompt: Mutex<Option<String>>,
}

impl ScriptedProvider {
    fn new(fragments: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
            last_user_prompt: Mutex::new(None),
        })
    }

    fn full_text(&self) -> String {
        self.fragments.concat()
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self, prompt: &AnalysisPrompt) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_user_prompt.lock().unwrap() = Some(prompt.user.clone());
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(
        &self,
        prompt: &AnalysisPrompt,
        _options: &CompletionOptions,
    ) -> Result<Completion, GapScanError> {
        self.record(prompt);
        Ok(Completion {
            text: self.full_text(),
            input_tokens: Some(150),
            output_tokens: Some(80),
        })
    }

    async fn complete_stream(
        &self,
        prompt: &AnalysisPrompt,
        _options: &CompletionOptions,
    ) -> Result<FragmentStream, GapScanError> {
        self.record(prompt);
        let items: Vec<Result<String, GapScanError>> =
            self.fragments.iter().cloned().map(Ok).collect();
        Ok(Box::pin(stream::iter(items)))
    }
}

/// Never produces a fragment; used to drive the relay into its deadline.
struct StalledProvider;

#[async_trait]
impl CompletionProvider for StalledProvider {
    async fn complete(
        &self,
        _prompt: &AnalysisPrompt,
        _options: &CompletionOptions,
    ) -> Result<Completion, GapScanError> {
        futures::future::pending().await
    }

    async fn complete_stream(
        &self,
        _prompt: &AnalysisPrompt,
        _options: &CompletionOptions,
    ) -> Result<FragmentStream, GapScanError> {
        Ok(Box::pin(stream::pending()))
    }
}

// ── PDF fixture ──────────────────────────────────────────────────────────

/// Build an in-memory PDF with one text line per page.
fn sample_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn test_server(provider: Arc<dyn CompletionProvider>) -> TestServer {
    let config = AnalysisConfig::builder()
        .provider(provider)
        .build()
        .unwrap();
    TestServer::new(gapscan::server::router(Arc::new(config))).unwrap()
}

fn pdf_form(bytes: Vec<u8>, mime: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(bytes).file_name("document.pdf").mime_type(mime),
    )
}

/// Parse an SSE body into the JSON payloads of its `data:` frames, skipping
/// unparseable lines the way the browser client does.
fn parse_sse(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter_map(|payload| serde_json::from_str(payload).ok())
        .collect()
}

fn concat_content(events: &[serde_json::Value]) -> String {
    events
        .iter()
        .filter_map(|e| e["content"].as_str())
        .collect()
}

// ── HTTP surface ─────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    let server = test_server(ScriptedProvider::new(&["x"]));
    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let json: serde_json::Value = response.json();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "gapscan");
}

#[tokio::test]
async fn missing_file_is_400() {
    let provider = ScriptedProvider::new(&["unused"]);
    let server = test_server(provider.clone());

    let form = MultipartForm::new().add_text("note", "no file here");
    let response = server.post("/api/analyze").multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let json: serde_json::Value = response.json();
    assert_eq!(json["error"], "No file provided");
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn wrong_media_type_is_400_and_never_reaches_provider() {
    let provider = ScriptedProvider::new(&["unused"]);
    let server = test_server(provider.clone());

    let response = server
        .post("/api/analyze")
        .multipart(pdf_form(sample_pdf(&["real pdf bytes"]), "text/plain"))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let json: serde_json::Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("must be a PDF"));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn textless_pdf_is_400_empty_document() {
    let provider = ScriptedProvider::new(&["unused"]);
    let server = test_server(provider.clone());

    let response = server
        .post("/api/analyze")
        .multipart(pdf_form(sample_pdf(&["", ""]), PDF_MEDIA_TYPE))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let json: serde_json::Value = response.json();
    assert_eq!(json["error"], "No text content found in PDF");
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn malformed_pdf_is_400() {
    let server = test_server(ScriptedProvider::new(&["unused"]));

    let response = server
        .post("/api/analyze")
        .multipart(pdf_form(b"definitely not a pdf".to_vec(), PDF_MEDIA_TYPE))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let json: serde_json::Value = response.json();
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("Failed to extract text"));
}

#[tokio::test]
async fn buffered_analysis_returns_text_and_length() {
    let provider = ScriptedProvider::new(&["# Key Findings\n", "- consent gap"]);
    let server = test_server(provider.clone());

    let response = server
        .post("/api/analyze")
        .multipart(pdf_form(
            sample_pdf(&["Subject consent form missing signature."]),
            PDF_MEDIA_TYPE,
        ))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let json: serde_json::Value = response.json();
    assert_eq!(json["analysis"], provider.full_text());
    assert_eq!(
        json["textLength"],
        "Subject consent form missing signature.".chars().count()
    );
}

#[tokio::test]
async fn streamed_analysis_frames_and_terminates() {
    let provider = ScriptedProvider::new(&["Gap ", "found"]);
    let server = test_server(provider.clone());

    let response = server
        .post("/api/analyze/stream")
        .multipart(pdf_form(sample_pdf(&["some protocol text"]), PDF_MEDIA_TYPE))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let content_type = response.header("content-type");
    assert!(content_type
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let events = parse_sse(&response.text());
    assert_eq!(concat_content(&events), "Gap found");

    let done_positions: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e["done"] == true)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(done_positions, vec![events.len() - 1], "exactly one done, last");

    // Default granularity is per character.
    for event in &events[..events.len() - 1] {
        assert_eq!(event["content"].as_str().unwrap().chars().count(), 1);
    }
}

#[tokio::test]
async fn streamed_and_buffered_content_are_equivalent() {
    let provider = ScriptedProvider::new(&["## Informed", " Consent\n", "- missing signature"]);
    let server = test_server(provider.clone());
    let pdf = sample_pdf(&["visit notes"]);

    let buffered: serde_json::Value = server
        .post("/api/analyze")
        .multipart(pdf_form(pdf.clone(), PDF_MEDIA_TYPE))
        .await
        .json();

    let streamed = server
        .post("/api/analyze/stream")
        .multipart(pdf_form(pdf, PDF_MEDIA_TYPE))
        .await;

    let events = parse_sse(&streamed.text());
    assert_eq!(concat_content(&events), buffered["analysis"].as_str().unwrap());
}

// ── End-to-end scenario ──────────────────────────────────────────────────

#[tokio::test]
async fn consent_finding_flows_through_the_whole_pipeline() {
    let provider = ScriptedProvider::new(&[
        "# Key Findings\n",
        "- Consent form signature is missing\n\n",
        "# Analysis by Domain\n",
        "## Informed Consent\n",
        "The consent form lacks a subject signature.\n\n",
        "# Recommendations\n",
        "- **High**: obtain and file the signed form\n",
    ]);
    let server = test_server(provider.clone());

    let pdf = sample_pdf(&["Subject consent form", "missing signature."]);
    let response = server
        .post("/api/analyze/stream")
        .multipart(pdf_form(pdf, PDF_MEDIA_TYPE))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let events = parse_sse(&response.text());
    let analysis = concat_content(&events);

    // Structural markers, not exact wording.
    assert!(analysis.contains("# Key Findings"));
    assert!(analysis.contains("## Informed Consent"));

    // The prompt the provider saw contains both pages, newline-joined, plus
    // the reference corpus.
    let prompt = provider.last_user_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("Subject consent form\nmissing signature."));
    assert!(prompt.contains("Reference Case Studies:"));
}

// ── Relay deadline ───────────────────────────────────────────────────────

#[tokio::test]
async fn stalled_upstream_times_out_without_done() {
    let config = AnalysisConfig::builder()
        .provider(Arc::new(StalledProvider))
        .stream_timeout_secs(1)
        .build()
        .unwrap();

    let document = UploadedDocument::new(sample_pdf(&["text"]), PDF_MEDIA_TYPE);
    let events: Vec<_> = gapscan::analyze_stream(document, &config)
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        Err(GapScanError::StreamTimeout { secs: 1 })
    ));
    assert!(!events
        .iter()
        .any(|e| matches!(e, Ok(StreamEvent::Done { .. }))));
}

// ── Library-level checks ─────────────────────────────────────────────────

#[tokio::test]
async fn buffered_output_reports_provider_usage() {
    let provider = ScriptedProvider::new(&["analysis text"]);
    let config = AnalysisConfig::builder()
        .provider(provider.clone())
        .build()
        .unwrap();

    let document = UploadedDocument::new(sample_pdf(&["doc body"]), PDF_MEDIA_TYPE);
    let output = gapscan::analyze(document, &config).await.unwrap();

    assert_eq!(output.analysis, "analysis text");
    assert_eq!(output.stats.input_tokens, Some(150));
    assert_eq!(output.stats.output_tokens, Some(80));
    assert_eq!(output.text_length, output.stats.extracted_chars);
}

#[tokio::test]
async fn custom_case_studies_reach_the_prompt() {
    let provider = ScriptedProvider::new(&["ok"]);
    let config = AnalysisConfig::builder()
        .provider(provider.clone())
        .case_studies("Case 99: site lost the delegation log.")
        .build()
        .unwrap();

    let document = UploadedDocument::new(sample_pdf(&["doc"]), PDF_MEDIA_TYPE);
    gapscan::analyze(document, &config).await.unwrap();

    let prompt = provider.last_user_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("Case 99: site lost the delegation log."));
}
