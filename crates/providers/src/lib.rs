//! Generation service implementations for Quill.
//!
//! All providers implement the `quill_core::Provider` trait.
//! [`build_from_config`] picks one based on `[model] provider`.

pub mod mock;
pub mod openai_compat;

use std::sync::Arc;

use quill_config::AppConfig;
use quill_core::error::ProviderError;
use quill_core::provider::Provider;

pub use mock::MockProvider;
pub use openai_compat::OpenAiCompatProvider;

/// Build the configured provider.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let model = &config.model;
    let key = model.api_key.clone().unwrap_or_default();

    let require_key = |env_hint: &str| -> Result<(), ProviderError> {
        if key.is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{}'; set {env_hint} or model.api_key",
                model.provider
            )));
        }
        Ok(())
    };

    let provider: Arc<dyn Provider> = match model.provider.as_str() {
        "mock" => Arc::new(MockProvider::new()),
        "gemini" => {
            require_key("GEMINI_API_KEY")?;
            let base = model
                .base_url
                .as_deref()
                .unwrap_or(openai_compat::GEMINI_BASE_URL);
            Arc::new(OpenAiCompatProvider::new("gemini", base, key.clone())?)
        }
        "openai" => {
            require_key("OPENAI_API_KEY")?;
            let base = model
                .base_url
                .as_deref()
                .unwrap_or(openai_compat::OPENAI_BASE_URL);
            Arc::new(OpenAiCompatProvider::new("openai", base, key.clone())?)
        }
        "openai-compatible" => {
            let base = model.base_url.as_deref().ok_or_else(|| {
                ProviderError::NotConfigured(
                    "provider 'openai-compatible' requires model.base_url".into(),
                )
            })?;
            Arc::new(OpenAiCompatProvider::new("openai-compatible", base, key.clone())?)
        }
        other => {
            return Err(ProviderError::NotConfigured(format!(
                "unknown provider '{other}' (expected gemini, openai, openai-compatible, or mock)"
            )));
        }
    };

    tracing::debug!(provider = provider.name(), model = %model.name, "Provider ready");
    Ok(provider)
}
