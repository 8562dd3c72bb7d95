//! In-memory player profile store.

use async_trait::async_trait;
use nexus_core::error::StoreError;
use nexus_core::profile::{PlayerProfile, ProfileStore};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryProfiles {
    profiles: Arc<RwLock<HashMap<String, PlayerProfile>>>,
}

impl InMemoryProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a profile.
    pub async fn insert(&self, user_id: impl Into<String>, profile: PlayerProfile) {
        self.profiles.write().await.insert(user_id.into(), profile);
    }

    /// Seed profiles from a JSON file mapping user id → profile.
    pub async fn load_json(&self, path: &Path) -> Result<usize, StoreError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::Storage(format!("{}: {e}", path.display())))?;
        let parsed: HashMap<String, PlayerProfile> = serde_json::from_str(&content)
            .map_err(|e| StoreError::QueryFailed(format!("{}: {e}", path.display())))?;

        let count = parsed.len();
        self.profiles.write().await.extend(parsed);
        Ok(count)
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfiles {
    async fn get(&self, user_id: &str) -> Result<Option<PlayerProfile>, StoreError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn update_analysis(
        &self,
        user_id: &str,
        analysis: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(user_id)
            .ok_or_else(|| StoreError::QueryFailed(format!("no profile for user {user_id}")))?;
        profile.analysis = analysis;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_analysis_replaces_map() {
        let store = InMemoryProfiles::new();
        store.insert("u1", PlayerProfile::new("Faker")).await;

        let mut analysis = serde_json::Map::new();
        analysis.insert("recent_mood".into(), serde_json::json!("focused"));
        store.update_analysis("u1", analysis).await.unwrap();

        let profile = store.get("u1").await.unwrap().unwrap();
        assert_eq!(profile.analysis["recent_mood"], "focused");
    }

    #[tokio::test]
    async fn update_unknown_user_fails() {
        let store = InMemoryProfiles::new();
        assert!(store
            .update_analysis("ghost", serde_json::Map::new())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn load_json_seeds_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(
            &path,
            r#"{"u1": {"username": "tenz", "favorite_games": ["Valorant"]}}"#,
        )
        .unwrap();

        let store = InMemoryProfiles::new();
        assert_eq!(store.load_json(&path).await.unwrap(), 1);
        let profile = store.get("u1").await.unwrap().unwrap();
        assert_eq!(profile.favorite_games, vec!["Valorant"]);
    }
}
