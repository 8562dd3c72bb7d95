//! League of Legends: current patch and champion roster from Data Dragon,
//! plus the free champion rotation from the Riot platform API.
//!
//! Requires a Riot API key; without one the source never returns data.

use async_trait::async_trait;
use std::collections::HashMap;

use super::{AuthoritativeSource, get_json};

const DDRAGON_URL: &str = "https://ddragon.leagueoflegends.com";
const PLATFORM_URL: &str = "https://na1.api.riotgames.com";

pub struct LeagueSource {
    client: reqwest::Client,
    api_key: Option<String>,
    ddragon_url: String,
    platform_url: String,
}

impl LeagueSource {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            ddragon_url: DDRAGON_URL.into(),
            platform_url: PLATFORM_URL.into(),
        }
    }

    pub fn with_base_urls(mut self, ddragon: impl Into<String>, platform: impl Into<String>) -> Self {
        self.ddragon_url = ddragon.into();
        self.platform_url = platform.into();
        self
    }
}

/// Combine patch, champion list and rotation into one payload.
///
/// Rotation ids without a matching champion are reported as `ID:<n>`.
fn summarize(
    patch: &str,
    champions: &serde_json::Value,
    rotation: &serde_json::Value,
) -> Option<serde_json::Map<String, serde_json::Value>> {
    let roster = champions.get("data")?.as_object()?;

    let names: HashMap<i64, &str> = roster
        .values()
        .filter_map(|c| {
            let id = c["key"].as_str()?.parse::<i64>().ok()?;
            Some((id, c["name"].as_str()?))
        })
        .collect();

    let free_rotation: Vec<String> = rotation["freeChampionIds"]
        .as_array()
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_i64())
                .map(|id| {
                    names
                        .get(&id)
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| format!("ID:{id}"))
                })
                .collect()
        })
        .unwrap_or_default();

    let mut summary = serde_json::Map::new();
    summary.insert("patch".into(), patch.into());
    summary.insert("total_champions".into(), roster.len().into());
    summary.insert("free_rotation".into(), serde_json::json!(free_rotation));
    Some(summary)
}

#[async_trait]
impl AuthoritativeSource for LeagueSource {
    fn name(&self) -> &str {
        "riot_api"
    }

    fn matches(&self, subject_lower: &str) -> bool {
        subject_lower.contains("league") || subject_lower.contains("lol")
    }

    async fn fetch(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        let api_key = self.api_key.as_ref()?;

        let versions = get_json(
            self.client.get(format!("{}/api/versions.json", self.ddragon_url)),
            self.name(),
        )
        .await?;
        let patch = versions
            .get(0)
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        let champions = get_json(
            self.client.get(format!(
                "{}/cdn/{patch}/data/en_US/champion.json",
                self.ddragon_url
            )),
            self.name(),
        )
        .await?;

        let rotation = get_json(
            self.client
                .get(format!("{}/lol/platform/v3/champion-rotations", self.platform_url))
                .header("X-Riot-Token", api_key),
            self.name(),
        )
        .await?;

        summarize(&patch, &champions, &rotation)
    }
}
