//! VLM interaction: send the photo with the analysis prompt, get plain text.
//!
//! Handlers never talk to a provider directly. They hold an
//! `Arc<dyn PlantAnalyzer>` built once at startup, which keeps the model
//! client out of global state and lets tests swap in a fake.
//!
//! There is exactly one request per upload: no retries, no backoff. Any
//! failure becomes [`PlantDocError::ExternalService`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::PlantDocError;
use crate::pipeline::encode::EncodedImage;
use crate::prompts::PLANT_ANALYSIS_PROMPT;

/// Produces a plain-text analysis for one photo.
#[async_trait]
pub trait PlantAnalyzer: Send + Sync {
    async fn analyze(&self, image: &EncodedImage) -> Result<String, PlantDocError>;
}

/// [`PlantAnalyzer`] backed by an edgequake-llm provider.
pub struct LlmAnalyzer {
    provider: Arc<dyn LLMProvider>,
    prompt: String,
    options: CompletionOptions,
    timeout: Option<Duration>,
}

impl LlmAnalyzer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ServerConfig) -> Self {
        Self {
            provider,
            prompt: config
                .analysis_prompt
                .clone()
                .unwrap_or_else(|| PLANT_ANALYSIS_PROMPT.to_string()),
            options: build_options(config),
            timeout: (config.api_timeout_secs > 0)
                .then(|| Duration::from_secs(config.api_timeout_secs)),
        }
    }

    /// Resolve a provider from `config` and the environment, then wrap it.
    pub fn from_config(config: &ServerConfig) -> Result<Self, PlantDocError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }
}

#[async_trait]
impl PlantAnalyzer for LlmAnalyzer {
    async fn analyze(&self, image: &EncodedImage) -> Result<String, PlantDocError> {
        let start = Instant::now();

        // Single user turn: instruction text plus the photo.
        let messages = vec![ChatMessage::user_with_images(
            self.prompt.as_str(),
            vec![image.to_image_data()],
        )];

        let call = self.provider.chat(&messages, Some(&self.options));
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                warn!("Model call timed out after {}s", limit.as_secs());
                PlantDocError::ExternalService(format!(
                    "model call timed out after {}s",
                    limit.as_secs()
                ))
            })?,
            None => call.await,
        }
        .map_err(|e| {
            warn!("Model call failed: {}", e);
            PlantDocError::ExternalService(e.to_string())
        })?;

        debug!(
            "Analysis: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        let text = extract_text(&response.content)?;
        info!(
            "Analysis complete: {} chars in {}ms",
            text.len(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

/// Guard the response shape: a reply without text is a provider failure.
pub fn extract_text(content: &str) -> Result<String, PlantDocError> {
    let text = content.trim();
    if text.is_empty() {
        return Err(PlantDocError::ExternalService(
            "model returned an empty response".into(),
        ));
    }
    Ok(text.to_string())
}

/// Build `CompletionOptions` from the server config.
fn build_options(config: &ServerConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: config.temperature,
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, PlantDocError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PlantDocError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model` or
///    [`crate::config::DEFAULT_MODEL`].
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **Gemini** when `GEMINI_API_KEY` is set.
/// 5. **Full auto-detection** via `ProviderFactory::from_env`.
pub fn resolve_provider(config: &ServerConfig) -> Result<Arc<dyn LLMProvider>, PlantDocError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        info!("Using provider '{}' with model '{}'", name, config.model_or_default());
        return create_vision_provider(name, config.model_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            info!("Using provider '{}' with model '{}' from environment", prov, model);
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            info!("Using provider 'gemini' with model '{}'", config.model_or_default());
            return create_vision_provider("gemini", config.model_or_default());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PlantDocError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = ServerConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, None);
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn build_options_carries_temperature() {
        let config = ServerConfig::builder().temperature(0.4).max_tokens(512).build().unwrap();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.4));
        assert_eq!(opts.max_tokens, Some(512));
    }

    #[test]
    fn extract_text_trims() {
        assert_eq!(extract_text("  Ficus lyrata\n").unwrap(), "Ficus lyrata");
    }

    #[test]
    fn extract_text_rejects_blank() {
        let err = extract_text(" \n\t").unwrap_err();
        assert!(matches!(err, PlantDocError::ExternalService(_)));
        assert!(err.to_string().contains("empty"));
    }
}
