//! CLI binary for gapscan.
//!
//! A thin shim over the library crate: `serve` runs the HTTP service,
//! `analyze` performs a one-shot analysis from the terminal.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use gapscan::{AnalysisConfig, StreamEvent, UploadedDocument, PDF_MEDIA_TYPE};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service
  gapscan serve --addr 0.0.0.0:8080

  # One-shot analysis, streamed to the terminal as it is generated
  gapscan analyze --stream monitoring_report.pdf

  # Buffered analysis with a custom reference corpus
  gapscan analyze --case-studies our_inspections.md protocol.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY   API key for the completion endpoint
  RUST_LOG         Log filter (default: gapscan=info,tower_http=info)

SETUP:
  1. Set the API key:  export OPENAI_API_KEY=sk-...
  2. Serve:            gapscan serve
  3. Upload:           curl -N -F "file=@doc.pdf;type=application/pdf" \
                           http://localhost:8080/api/analyze/stream"#;

#[derive(Parser)]
#[command(name = "gapscan", version, about, after_help = AFTER_HELP)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP analysis service
    Serve(ServeArgs),
    /// Analyze a single PDF and print the result
    Analyze(AnalyzeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "GAPSCAN_ADDR", default_value = "0.0.0.0:8080")]
    addr: String,

    #[command(flatten)]
    analysis: AnalysisArgs,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// PDF file to analyze
    file: PathBuf,

    /// Stream the analysis to stdout as it is generated
    #[arg(long)]
    stream: bool,

    #[command(flatten)]
    analysis: AnalysisArgs,
}

/// Flags shared by both subcommands, mapped onto `AnalysisConfig`.
#[derive(Args)]
struct AnalysisArgs {
    /// Completion model
    #[arg(long, env = "GAPSCAN_MODEL", default_value = "gpt-4o-mini")]
    model: String,

    /// Sampling temperature (0.0–2.0)
    #[arg(long, default_value_t = 0.0)]
    temperature: f32,

    /// Output-token ceiling for the completion
    #[arg(long, default_value_t = 4000)]
    max_tokens: u32,

    /// Replace the built-in reference case studies with this file's contents
    #[arg(long)]
    case_studies: Option<PathBuf>,

    /// Hard ceiling on a streaming analysis, in seconds
    #[arg(long, default_value_t = 240)]
    stream_timeout_secs: u64,
}

impl AnalysisArgs {
    fn into_config(self) -> Result<AnalysisConfig> {
        let mut builder = AnalysisConfig::builder()
            .model(self.model)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .stream_timeout_secs(self.stream_timeout_secs);

        if let Some(path) = self.case_studies {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading case studies from {}", path.display()))?;
            builder = builder.case_studies(text);
        }

        Ok(builder.build()?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gapscan=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            let config = Arc::new(args.analysis.into_config()?);
            gapscan::server::serve(&args.addr, config)
                .await
                .context("server failed")?;
        }
        Command::Analyze(args) => {
            let bytes = std::fs::read(&args.file)
                .with_context(|| format!("reading {}", args.file.display()))?;
            let document = UploadedDocument::new(bytes, PDF_MEDIA_TYPE);
            let config = args.analysis.into_config()?;

            if args.stream {
                let mut events = gapscan::analyze_stream(document, &config).await?;
                let mut stdout = std::io::stdout().lock();
                while let Some(event) = events.next().await {
                    match event? {
                        StreamEvent::Content { content } => {
                            write!(stdout, "{content}")?;
                            stdout.flush()?;
                        }
                        StreamEvent::Done { .. } => break,
                    }
                }
                writeln!(stdout)?;
            } else {
                let output = gapscan::analyze(document, &config).await?;
                println!("{}", output.analysis);
                eprintln!(
                    "{} chars analysed in {} ms",
                    output.text_length, output.stats.total_duration_ms
                );
            }
        }
    }

    Ok(())
}
