//! Provider trait: the abstraction over the text-generation model service.
//!
//! A Provider takes a system instruction plus an ordered message list and
//! returns the generated text. It is a black box: the agent loop only
//! relies on it returning text or a transport/quota error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// A single generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The model to use (e.g., "gemini-2.0-flash")
    pub model: String,

    /// System instruction; empty means none
    #[serde(default)]
    pub system_instruction: String,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl GenerateRequest {
    /// A request with the default temperature and no token cap.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            system_instruction: String::new(),
            messages,
            temperature: default_temperature(),
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// The core Provider trait.
///
/// The agent loop, the generative fallback, and the profile insight task
/// all call `generate()` without knowing which backend answers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini").
    fn name(&self) -> &str;

    /// Send a request and get the complete generated text.
    async fn generate(&self, request: GenerateRequest) -> Result<String, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
