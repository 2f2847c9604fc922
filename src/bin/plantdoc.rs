//! Server binary for edgequake-plantdoc.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServerConfig`, builds the model client once and serves HTTP.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_plantdoc::{serve, LlmAnalyzer, ServerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default port (8082) with Gemini
  export GEMINI_API_KEY=...
  plantdoc

  # Different address and storage directories
  plantdoc --bind 127.0.0.1:9000 --upload-dir /tmp/plantdoc/up --reports-dir /tmp/plantdoc/out

  # Another vision model
  plantdoc --provider openai --model gpt-4.1-mini

  # Custom analysis instructions
  plantdoc --analysis-prompt prompts/botanist.txt

ENDPOINTS:
  GET  /analyze    liveness probe, returns {"success":"true"}
  POST /analyze    multipart photo upload, returns {"result": ..., "image": <data URI>}
  POST /download   JSON {"result": ..., "image": <data URI>?}, returns a PDF attachment
  GET  /health     returns OK

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Provider used when --provider is not given
  EDGEQUAKE_MODEL         Model ID
  RUST_LOG                Log filter, overrides --verbose/--quiet
"#;

/// Plant photo analysis server backed by a vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "plantdoc",
    version,
    about = "Plant photo analysis server backed by a vision LLM",
    long_about = "Accepts plant photos over HTTP, asks a vision language model for species, \
health and care advice, and renders the answer as a downloadable PDF report.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "PLANTDOC_BIND", default_value = "0.0.0.0:8082")]
    bind: String,

    /// Directory for uploads while they are analysed.
    #[arg(long, env = "PLANTDOC_UPLOAD_DIR", default_value = "upload")]
    upload_dir: PathBuf,

    /// Directory for reports while they are downloaded.
    #[arg(long, env = "PLANTDOC_REPORTS_DIR", default_value = "reports")]
    reports_dir: PathBuf,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set, \
          preferring Gemini when GEMINI_API_KEY is present."
    )]
    provider: Option<String>,

    /// LLM model ID (default: gemini-2.5-flash).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM temperature (0.0–2.0). Provider default when unset.
    #[arg(long, env = "PLANTDOC_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max LLM output tokens per analysis.
    #[arg(long, env = "PLANTDOC_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM call timeout in seconds, 0 to disable.
    #[arg(long, env = "PLANTDOC_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Largest accepted upload in MiB.
    #[arg(long, env = "PLANTDOC_MAX_UPLOAD_MB", default_value_t = 20,
          value_parser = clap::value_parser!(u64).range(1..=1024))]
    max_upload_mb: u64,

    /// Path to a text file replacing the built-in analysis prompt.
    #[arg(long, env = "PLANTDOC_ANALYSIS_PROMPT")]
    analysis_prompt: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PLANTDOC_VERBOSE")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, env = "PLANTDOC_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;
    let analyzer = LlmAnalyzer::from_config(&config).context("Could not set up the LLM provider")?;
    info!("Model: {}", config.model_or_default());

    serve(&config, Arc::new(analyzer), shutdown_signal())
        .await
        .with_context(|| format!("Server on {} failed", config.bind))?;

    Ok(())
}

/// Map CLI args to `ServerConfig`.
async fn build_config(cli: &Cli) -> Result<ServerConfig> {
    let mut builder = ServerConfig::builder()
        .bind(cli.bind.clone())
        .upload_dir(cli.upload_dir.clone())
        .reports_dir(cli.reports_dir.clone())
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .max_upload_bytes((cli.max_upload_mb * 1024 * 1024) as usize);

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(ref path) = cli.analysis_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read analysis prompt from {:?}", path))?;
        builder = builder.analysis_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
