//! OpenAI-compatible provider implementation.
//!
//! Gemini exposes an OpenAI-compatible `/chat/completions` endpoint, so one
//! client covers the default deployment as well as OpenAI, OpenRouter,
//! Ollama and any other compatible gateway.

use async_trait::async_trait;
use nexus_core::error::ProviderError;
use nexus_core::message::{Message, Role};
use nexus_core::provider::GenerateRequest;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// A chat-completions provider speaking the OpenAI wire format.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new provider with a per-request timeout.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Gemini's OpenAI-compatible endpoint (convenience constructor).
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self::new(
            "gemini",
            "https://generativelanguage.googleapis.com/v1beta/openai",
            api_key,
            Duration::from_secs(30),
        )
    }

    /// Convert the system instruction and messages to the API format.
    ///
    /// The system instruction travels as a leading `system` message and
    /// model turns map to `assistant`.
    fn to_api_messages(system_instruction: &str, messages: &[Message]) -> Vec<ApiMessage> {
        let system = (!system_instruction.is_empty()).then(|| ApiMessage {
            role: "system".into(),
            content: Some(system_instruction.to_string()),
        });

        system
            .into_iter()
            .chain(messages.iter().map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Model => "assistant".into(),
                },
                content: Some(m.content.clone()),
            }))
            .collect()
    }

    /// Map a non-success HTTP status to a provider error.
    fn status_error(status: u16, body: String) -> ProviderError {
        match status {
            429 => ProviderError::RateLimited {
                retry_after_secs: 5,
            },
            401 | 403 => ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ),
            _ => ProviderError::ApiError {
                status_code: status,
                message: body,
            },
        }
    }
}

#[async_trait]
impl nexus_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.system_instruction, &request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            "Sending generate request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(Self::status_error(status, error_body));
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice =
            api_response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::ApiError {
                    status_code: 200,
                    message: "No choices in response".into(),
                })?;

        Ok(choice.message.content.unwrap_or_default())
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- API types ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use nexus_core::Provider;

    /// Serve a single fixed response on `/chat/completions` and return the base URL.
    async fn mock_endpoint(status: StatusCode, body: serde_json::Value) -> String {
        let app = Router::new().route(
            "/chat/completions",
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn provider(base_url: String) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new("test", base_url, "key", Duration::from_secs(5))
    }

    #[test]
    fn gemini_constructor() {
        let provider = OpenAiCompatProvider::gemini("AIza-test");
        assert_eq!(provider.name(), "gemini");
        assert!(provider.base_url.contains("generativelanguage.googleapis.com"));
    }

    #[test]
    fn message_conversion_prepends_system() {
        let messages = vec![Message::user("Hello"), Message::model("Hey!")];
        let api_messages = OpenAiCompatProvider::to_api_messages("You are Nexus", &messages);
        assert_eq!(api_messages.len(), 3);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
        assert_eq!(api_messages[2].role, "assistant");
    }

    #[test]
    fn empty_system_instruction_is_omitted() {
        let api_messages = OpenAiCompatProvider::to_api_messages("", &[Message::user("hi")]);
        assert_eq!(api_messages.len(), 1);
        assert_eq!(api_messages[0].role, "user");
    }

    #[test]
    fn status_mapping() {
        assert!(OpenAiCompatProvider::status_error(429, String::new()).is_rate_limited());
        assert!(matches!(
            OpenAiCompatProvider::status_error(401, String::new()),
            ProviderError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            OpenAiCompatProvider::status_error(500, "boom".into()),
            ProviderError::ApiError { status_code: 500, .. }
        ));
    }

    #[tokio::test]
    async fn generate_returns_first_choice_text() {
        let url = mock_endpoint(
            StatusCode::OK,
            serde_json::json!({
                "model": "gemini-2.0-flash",
                "choices": [{"message": {"role": "assistant", "content": "FINAL_ANSWER: gg"}}]
            }),
        )
        .await;

        let text = provider(url)
            .generate(GenerateRequest::new("gemini-2.0-flash", vec![Message::user("hi")]))
            .await
            .unwrap();
        assert_eq!(text, "FINAL_ANSWER: gg");
    }

    #[tokio::test]
    async fn quota_error_is_rate_limited() {
        let url = mock_endpoint(
            StatusCode::TOO_MANY_REQUESTS,
            serde_json::json!({"error": {"status": "RESOURCE_EXHAUSTED"}}),
        )
        .await;

        let err = provider(url)
            .generate(GenerateRequest::new("m", vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn empty_choices_is_error() {
        let url = mock_endpoint(StatusCode::OK, serde_json::json!({"choices": []})).await;

        let err = provider(url)
            .generate(GenerateRequest::new("m", vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 200, .. }));
    }
}
