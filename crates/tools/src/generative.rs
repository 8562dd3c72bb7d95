//! Generative fallback: asks the model service itself for structured
//! game data when no dedicated API exists.

use nexus_core::message::Message;
use nexus_core::provider::{GenerateRequest, Provider};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::resolver::QueryKind;

/// Output of one generative lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Generated {
    /// The model returned a JSON object.
    Structured(serde_json::Map<String, serde_json::Value>),
    /// The model answered, but not with a JSON object.
    Raw(String),
}

impl Generated {
    /// Payload form; raw text is wrapped as `{"raw_response": ...}`.
    pub fn into_map(self) -> serde_json::Map<String, serde_json::Value> {
        match self {
            Self::Structured(map) => map,
            Self::Raw(text) => {
                let mut map = serde_json::Map::new();
                map.insert("raw_response".into(), serde_json::Value::String(text));
                map
            }
        }
    }
}

/// Model-backed data source.
pub struct GenerativeFetcher {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl GenerativeFetcher {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.3,
            max_tokens: 800,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Ask for data about `subject`. `None` on transport failure.
    pub async fn fetch(&self, subject: &str, kind: QueryKind) -> Option<Generated> {
        let request = GenerateRequest::new(&self.model, vec![Message::user(prompt_for(subject, kind))])
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        match self.provider.generate(request).await {
            Ok(text) => {
                let generated = parse_generated(&text);
                if matches!(generated, Generated::Raw(_)) {
                    debug!(subject, kind = kind.as_str(), "Generative output was not a JSON object");
                }
                Some(generated)
            }
            Err(e) => {
                warn!(subject, kind = kind.as_str(), error = %e, "Generative fetch failed");
                None
            }
        }
    }
}

fn prompt_for(subject: &str, kind: QueryKind) -> String {
    match kind {
        QueryKind::Meta => format!(
            "Provide the current meta information for {subject} as of today.\n\
             Include: current patch/version/season, top tier characters/weapons, \
             current meta summary (2-3 sentences), 5 tips for ranked play.\n\
             Respond in valid JSON: {{\"patch\": \"...\", \"top_tier\": {{}}, \
             \"meta_summary\": \"...\", \"tips\": [...]}}\n\
             Only respond with JSON, no markdown."
        ),
        QueryKind::General => format!(
            "Provide general information about {subject}.\n\
             Include: developer, genre list, platforms, player count, brief description, \
             difficulty, time per match, free to play status, 5 beginner tips.\n\
             Respond in valid JSON: {{\"developer\": \"...\", \"genre\": [...], \
             \"platforms\": [...], \"description\": \"...\", \"difficulty\": \"...\", \
             \"beginner_tips\": [...]}}\n\
             Only respond with JSON, no markdown."
        ),
        QueryKind::Recommendations => format!(
            "Suggest 6 games similar to {subject} with brief reasons.\n\
             Respond in valid JSON: {{\"similar_games\": [{{\"name\": \"...\", \"reason\": \"...\"}}, ...]}}\n\
             Only respond with JSON, no markdown."
        ),
    }
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let mut text = text.trim();
    if text.starts_with("```") {
        text = match text.split_once('\n') {
            Some((_, rest)) => rest,
            None => &text[3..],
        };
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }
    text.trim()
}

/// Interpret model output as a JSON object, keeping raw text otherwise.
pub fn parse_generated(text: &str) -> Generated {
    match serde_json::from_str::<serde_json::Value>(strip_code_fence(text)) {
        Ok(serde_json::Value::Object(map)) => Generated::Structured(map),
        _ => Generated::Raw(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nexus_core::error::ProviderError;

    struct FixedProvider(Result<String, ProviderError>);

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, request: GenerateRequest) -> Result<String, ProviderError> {
            assert!((request.temperature - 0.3).abs() < f32::EPSILON);
            assert_eq!(request.max_tokens, Some(800));
            self.0.clone()
        }
    }

    #[test]
    fn strips_fence_with_language_tag() {
        let text = "```json\n{\"patch\": \"14.3\"}\n```";
        assert_eq!(strip_code_fence(text), "{\"patch\": \"14.3\"}");
    }

    #[test]
    fn unfenced_text_untouched() {
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn non_object_json_is_raw() {
        assert!(matches!(parse_generated("[1, 2]"), Generated::Raw(_)));
        assert!(matches!(parse_generated("Sorry, I can't."), Generated::Raw(_)));
    }

    #[test]
    fn raw_wraps_into_map() {
        let map = Generated::Raw("nope".into()).into_map();
        assert_eq!(map["raw_response"], "nope");
    }

    #[test]
    fn prompt_mentions_subject_and_shape() {
        let prompt = prompt_for("Elden Ring", QueryKind::General);
        assert!(prompt.contains("Elden Ring"));
        assert!(prompt.contains("\"beginner_tips\""));
    }

    #[tokio::test]
    async fn fetch_parses_fenced_json() {
        let fetcher = GenerativeFetcher::new(
            Arc::new(FixedProvider(Ok("```json\n{\"patch\": \"1.2\"}\n```".into()))),
            "m",
        );
        let out = fetcher.fetch("Deadlock", QueryKind::Meta).await.unwrap();
        assert_eq!(out, Generated::Structured(serde_json::from_str(r#"{"patch":"1.2"}"#).unwrap()));
    }

    #[tokio::test]
    async fn fetch_transport_error_is_none() {
        let fetcher = GenerativeFetcher::new(
            Arc::new(FixedProvider(Err(ProviderError::Network("down".into())))),
            "m",
        );
        assert!(fetcher.fetch("Deadlock", QueryKind::Meta).await.is_none());
    }
}
