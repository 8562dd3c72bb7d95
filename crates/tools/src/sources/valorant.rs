//! Valorant agent roster from the community valorant-api.com service.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{AuthoritativeSource, get_json};

const DEFAULT_BASE_URL: &str = "https://valorant-api.com";

pub struct ValorantSource {
    client: reqwest::Client,
    base_url: String,
}

impl ValorantSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Group playable agents by role.
fn summarize_agents(body: &serde_json::Value) -> Option<serde_json::Map<String, serde_json::Value>> {
    let agents = body.get("data")?.as_array()?;

    let mut by_role: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for agent in agents {
        let role = agent["role"]["displayName"].as_str().unwrap_or("Unknown");
        let name = agent["displayName"].as_str().unwrap_or("Unknown");
        by_role.entry(role.to_string()).or_default().push(name.to_string());
    }

    let mut summary = serde_json::Map::new();
    summary.insert("total_agents".into(), agents.len().into());
    summary.insert("agents_by_role".into(), serde_json::json!(by_role));
    Some(summary)
}

#[async_trait]
impl AuthoritativeSource for ValorantSource {
    fn name(&self) -> &str {
        "valorant_api"
    }

    fn matches(&self, subject_lower: &str) -> bool {
        subject_lower.contains("valorant")
    }

    async fn fetch(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        let url = format!("{}/v1/agents?isPlayableCharacter=true", self.base_url);
        let body = get_json(self.client.get(&url), self.name()).await?;
        summarize_agents(&body)
    }
}
