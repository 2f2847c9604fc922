//! # edgequake-plantdoc
//!
//! An HTTP service that identifies plants from photos and turns the answer
//! into a PDF report, using a Vision Language Model (VLM).
//!
//! ## Request Flows
//!
//! ```text
//! POST /analyze (multipart photo)
//!  │
//!  ├─ 1. Upload  stream the first file part into transient storage
//!  ├─ 2. Encode  read it back, base64 + data URI
//!  ├─ 3. VLM     one call to gemini-2.5-flash / gpt-4.1 / claude / …
//!  └─ 4. Reply   {"result": text, "image": data URI}; upload deleted
//!
//! POST /download ({"result", "image"?})
//!  │
//!  ├─ 1. Layout  title, date, wrapped body, photo (spawn_blocking)
//!  ├─ 2. Render  PDF written to transient storage
//!  └─ 3. Stream  attachment; file deleted once the body is done
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use edgequake_plantdoc::{serve, LlmAnalyzer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / ANTHROPIC_API_KEY
//!     let config = ServerConfig::builder().bind("127.0.0.1:8082").build()?;
//!     let analyzer = LlmAnalyzer::from_config(&config)?;
//!     serve(&config, Arc::new(analyzer), async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `plantdoc` binary (clap + anyhow + dotenvy + tracing-subscriber) |
//!
//! Disable `cli` to embed the router in another axum application:
//! ```toml
//! edgequake-plantdoc = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod transient;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::PlantDocError;
pub use output::{AnalysisResult, ReportRequest};
pub use pipeline::llm::{LlmAnalyzer, PlantAnalyzer};
pub use server::{router, serve, AppState};
pub use transient::TransientDirs;
