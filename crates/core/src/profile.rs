//! Player profile collaborator.
//!
//! A read-only snapshot of what the player told us at signup plus the
//! derived analysis the background insight task keeps refining.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::StoreError;

/// Optional personal details used for tone and region-specific advice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// A player's stored preference profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Account name; the only name the agent may address the player by
    pub username: String,

    #[serde(default)]
    pub favorite_games: Vec<String>,

    /// game → skill level (e.g. "Intermediate")
    #[serde(default)]
    pub skill_levels: BTreeMap<String, String>,

    /// game → rank (e.g. "Gold II")
    #[serde(default)]
    pub ranks: BTreeMap<String, String>,

    /// game → main role (e.g. "Jungle")
    #[serde(default)]
    pub main_roles: BTreeMap<String, String>,

    #[serde(default)]
    pub playstyle: Vec<String>,

    #[serde(default)]
    pub goals: Vec<String>,

    #[serde(default)]
    pub platforms: Vec<String>,

    #[serde(default)]
    pub personal: PersonalInfo,

    /// Derived personality analysis (archetype, coaching notes, hooks, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub analysis: serde_json::Map<String, serde_json::Value>,
}

impl PlayerProfile {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    /// True when the player has not filled in anything beyond their name.
    pub fn is_blank(&self) -> bool {
        self.favorite_games.is_empty()
            && self.skill_levels.is_empty()
            && self.ranks.is_empty()
            && self.main_roles.is_empty()
            && self.playstyle.is_empty()
            && self.goals.is_empty()
            && self.personal == PersonalInfo::default()
    }
}

/// Read access to player profiles, plus the one write the insight task needs.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<PlayerProfile>, StoreError>;

    /// Replace the derived analysis for a player.
    async fn update_analysis(
        &self,
        user_id: &str,
        analysis: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), StoreError>;
}
