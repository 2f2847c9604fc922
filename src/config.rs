//! Configuration for the plant analysis server.
//!
//! Every knob lives in [`ServerConfig`], built via [`ServerConfigBuilder`].
//! The CLI maps its flags onto the builder; library users and tests set only
//! the fields they care about and take the defaults for the rest.

use crate::error::PlantDocError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when a provider is named without an explicit model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for the HTTP server and its analysis client.
///
/// # Example
/// ```rust
/// use edgequake_plantdoc::ServerConfig;
///
/// let config = ServerConfig::builder()
///     .bind("127.0.0.1:9000")
///     .upload_dir("/tmp/plantdoc/upload")
///     .model("gemini-2.5-flash")
///     .build()
///     .unwrap();
/// assert_eq!(config.bind, "127.0.0.1:9000");
/// ```
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address to listen on. Default: `0.0.0.0:8082`.
    pub bind: String,

    /// Directory for transient uploads. Created at startup. Default: `upload`.
    pub upload_dir: PathBuf,

    /// Directory for transient PDF reports. Created at startup and again per report if missing. Default: `reports`.
    pub reports_dir: PathBuf,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic").
    /// If None, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// LLM model identifier. If None, [`DEFAULT_MODEL`] is used for named providers.
    pub model: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. None leaves the provider default in place.
    pub temperature: Option<f32>,

    /// Maximum tokens the model may generate per analysis. Default: 4096.
    pub max_tokens: usize,

    /// Per-call timeout for the model in seconds; 0 disables it. Default: 120.
    ///
    /// A hung provider otherwise holds the request open forever.
    pub api_timeout_secs: u64,

    /// Largest accepted request body for `/analyze`, in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,

    /// Custom analysis prompt. If None, uses [`crate::prompts::PLANT_ANALYSIS_PROMPT`].
    pub analysis_prompt: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8082".to_string(),
            upload_dir: PathBuf::from("upload"),
            reports_dir: PathBuf::from("reports"),
            provider_name: None,
            model: None,
            provider: None,
            temperature: None,
            max_tokens: 4096,
            api_timeout_secs: 120,
            max_upload_bytes: 20 * 1024 * 1024,
            analysis_prompt: None,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind", &self.bind)
            .field("upload_dir", &self.upload_dir)
            .field("reports_dir", &self.reports_dir)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("analysis_prompt", &self.analysis_prompt.as_ref().map(|p| p.len()))
            .finish()
    }
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model to request when a provider is created by name.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.config.bind = addr.into();
        self
    }

    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.reports_dir = dir.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn analysis_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.analysis_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServerConfig, PlantDocError> {
        let c = &self.config;
        if c.bind.trim().is_empty() {
            return Err(PlantDocError::InvalidConfig(
                "Bind address must not be empty".into(),
            ));
        }
        if c.upload_dir == c.reports_dir {
            return Err(PlantDocError::InvalidConfig(format!(
                "Upload and reports directories must differ, both are {:?}",
                c.upload_dir
            )));
        }
        if c.max_tokens == 0 {
            return Err(PlantDocError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.max_upload_bytes == 0 {
            return Err(PlantDocError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        if let Some(ref p) = c.analysis_prompt {
            if p.trim().is_empty() {
                return Err(PlantDocError::InvalidConfig(
                    "Analysis prompt must not be empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_layout() {
        let c = ServerConfig::default();
        assert_eq!(c.bind, "0.0.0.0:8082");
        assert_eq!(c.upload_dir, PathBuf::from("upload"));
        assert_eq!(c.reports_dir, PathBuf::from("reports"));
        assert_eq!(c.model_or_default(), DEFAULT_MODEL);
        assert_eq!(c.max_upload_bytes, 20 * 1024 * 1024);
    }

    #[test]
    fn temperature_is_clamped() {
        let c = ServerConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, Some(2.0));
    }

    #[test]
    fn same_transient_dirs_rejected() {
        let err = ServerConfig::builder()
            .upload_dir("tmp")
            .reports_dir("tmp")
            .build()
            .unwrap_err();
        assert!(matches!(err, PlantDocError::InvalidConfig(_)));
    }

    #[test]
    fn blank_prompt_rejected() {
        let err = ServerConfig::builder()
            .analysis_prompt("   ")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("prompt"), "got: {err}");
    }

    #[test]
    fn explicit_model_wins() {
        let c = ServerConfig::builder().model("gpt-4.1-mini").build().unwrap();
        assert_eq!(c.model_or_default(), "gpt-4.1-mini");
    }
}
