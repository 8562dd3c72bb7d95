//! Model service providers for Nexus.
//!
//! All providers implement the `nexus_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use nexus_core::error::ProviderError;
use nexus_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured model service provider.
///
/// Fails with `NotConfigured` when no API key is available.
pub fn build_from_config(
    config: &nexus_config::AppConfig,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured(
            "no API key; set NEXUS_API_KEY or GEMINI_API_KEY, or add api_key to config.toml".into(),
        )
    })?;

    let name = if config.api_url.contains("generativelanguage.googleapis.com") {
        "gemini"
    } else {
        "openai-compat"
    };

    Ok(Arc::new(OpenAiCompatProvider::new(
        name,
        &config.api_url,
        api_key,
        Duration::from_secs(config.agent.model_timeout_secs),
    )))
}
