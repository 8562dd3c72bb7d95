//! In-memory cache store, useful for testing and ephemeral deployments.

use async_trait::async_trait;
use nexus_core::cache::{CacheEntry, CacheStore};
use nexus_core::error::StoreError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Stores cache rows in a key-ordered map.
pub struct InMemoryCacheStore {
    entries: Arc<RwLock<BTreeMap<String, CacheEntry>>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn upsert(&self, entry: CacheEntry) -> Result<(), StoreError> {
        self.entries.write().await.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<CacheEntry>, StoreError> {
        Ok(self.entries.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(key: &str, source: &str) -> CacheEntry {
        CacheEntry {
            key: key.into(),
            data: serde_json::json!({"k": key}),
            source: source.into(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_overwrites() {
        let store = InMemoryCacheStore::new();
        store.upsert(entry("game:dota_2:meta", "static")).await.unwrap();
        store.upsert(entry("game:dota_2:meta", "generative")).await.unwrap();

        let loaded = store.load("game:dota_2:meta").await.unwrap().unwrap();
        assert_eq!(loaded.source, "generative");
        assert_eq!(store.entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn entries_ordered_by_key() {
        let store = InMemoryCacheStore::new();
        store.upsert(entry("recs:valorant", "s")).await.unwrap();
        store.upsert(entry("game:apex_legends:general", "s")).await.unwrap();

        let keys: Vec<String> = store
            .entries()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["game:apex_legends:general", "recs:valorant"]);
    }

    #[tokio::test]
    async fn remove_reports_existence() {
        let store = InMemoryCacheStore::new();
        store.upsert(entry("a", "s")).await.unwrap();
        assert!(store.remove("a").await.unwrap());
        assert!(!store.remove("a").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_upserts_same_key() {
        let store = Arc::new(InMemoryCacheStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .upsert(CacheEntry {
                        key: "shared".into(),
                        data: serde_json::json!(i),
                        source: "s".into(),
                        updated_at: Utc::now(),
                    })
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.entries().await.unwrap().len(), 1);
    }
}
