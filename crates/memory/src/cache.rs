//! TTL cache over a passive `CacheStore`.
//!
//! Freshness is decided on read: an entry is fresh while
//! `now - updated_at < ttl`. Expired rows are reported absent by `get`
//! but are never deleted here; they stay visible to `list`/`info` until
//! overwritten or explicitly invalidated.

use chrono::{DateTime, Duration, Utc};
use nexus_core::cache::{CacheEntry, CacheStore};
use nexus_core::error::StoreError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Source of the current time. Swapped for a manual clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// One row of the administrative cache listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheListing {
    pub key: String,
    pub source: String,
    pub age_hours: f64,
    pub fresh: bool,
}

/// Detail view of a single cached row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheInfo {
    pub key: String,
    pub source: String,
    pub updated_at: DateTime<Utc>,
    pub age_hours: f64,
}

/// Key/value cache with source provenance and age-based staleness.
#[derive(Clone)]
pub struct TtlCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl TtlCache {
    pub const DEFAULT_TTL_HOURS: i64 = 24;

    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            ttl: Duration::hours(Self::DEFAULT_TTL_HOURS),
        }
    }

    pub fn with_ttl_hours(mut self, hours: i64) -> Self {
        self.ttl = Duration::hours(hours);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Name of the backing store.
    pub fn backend(&self) -> &str {
        self.store.name()
    }

    fn age(&self, entry: &CacheEntry) -> Duration {
        self.clock.now() - entry.updated_at
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        self.age(entry) < self.ttl
    }

    /// Fresh payload for `key`, or `None` when missing or expired.
    pub async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.lookup(key).await?.map(|entry| entry.data))
    }

    /// Like `get`, but keeps the stored source tag.
    pub async fn lookup(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        match self.store.load(key).await? {
            Some(entry) if self.is_fresh(&entry) => {
                debug!(key, source = %entry.source, "Cache hit");
                Ok(Some(entry))
            }
            Some(_) => {
                debug!(key, "Cache entry expired");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Upsert `key`, refreshing `updated_at`.
    pub async fn set(
        &self,
        key: &str,
        data: serde_json::Value,
        source: &str,
    ) -> Result<(), StoreError> {
        self.store
            .upsert(CacheEntry {
                key: key.to_string(),
                data,
                source: source.to_string(),
                updated_at: self.clock.now(),
            })
            .await?;
        debug!(key, source, "Cache updated");
        Ok(())
    }

    /// Drop one row, or every row when `key` is `None`.
    pub async fn invalidate(&self, key: Option<&str>) -> Result<(), StoreError> {
        match key {
            Some(key) => {
                let existed = self.store.remove(key).await?;
                info!(key, existed, "Cache entry invalidated");
            }
            None => {
                self.store.clear().await?;
                info!("Cache flushed");
            }
        }
        Ok(())
    }

    /// Every row with its age and freshness, ordered by key.
    pub async fn list(&self) -> Result<Vec<CacheListing>, StoreError> {
        let entries = self.store.entries().await?;
        Ok(entries
            .iter()
            .map(|entry| CacheListing {
                key: entry.key.clone(),
                source: entry.source.clone(),
                age_hours: hours(self.age(entry)),
                fresh: self.is_fresh(entry),
            })
            .collect())
    }

    pub async fn info(&self, key: &str) -> Result<Option<CacheInfo>, StoreError> {
        Ok(self.store.load(key).await?.map(|entry| CacheInfo {
            age_hours: hours(self.age(&entry)),
            key: entry.key,
            source: entry.source,
            updated_at: entry.updated_at,
        }))
    }
}

/// Age in hours, rounded to one decimal.
fn hours(age: Duration) -> f64 {
    (age.num_seconds() as f64 / 360.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryCacheStore;
    use std::sync::Mutex;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(Utc::now())))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn cache_with(clock: Arc<ManualClock>) -> TtlCache {
        TtlCache::new(Arc::new(InMemoryCacheStore::new())).with_clock(clock)
    }

    #[tokio::test]
    async fn fresh_just_before_ttl() {
        let clock = ManualClock::new();
        let cache = cache_with(clock.clone());
        cache
            .set("game:valorant:meta", serde_json::json!({"patch": "9.1"}), "generative")
            .await
            .unwrap();

        clock.advance(Duration::hours(23) + Duration::minutes(59));
        let data = cache.get("game:valorant:meta").await.unwrap();
        assert_eq!(data, Some(serde_json::json!({"patch": "9.1"})));
    }

    #[tokio::test]
    async fn expired_after_ttl_but_still_listed() {
        let clock = ManualClock::new();
        let cache = cache_with(clock.clone());
        cache
            .set("game:valorant:meta", serde_json::json!({"patch": "9.1"}), "generative")
            .await
            .unwrap();

        clock.advance(Duration::hours(24) + Duration::minutes(1));
        assert!(cache.get("game:valorant:meta").await.unwrap().is_none());

        let listing = cache.list().await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].key, "game:valorant:meta");
        assert!(!listing[0].fresh);
        assert!(listing[0].age_hours >= 24.0);
    }

    #[tokio::test]
    async fn set_refreshes_expired_entry() {
        let clock = ManualClock::new();
        let cache = cache_with(clock.clone());
        cache.set("k", serde_json::json!(1), "static").await.unwrap();
        clock.advance(Duration::hours(30));
        cache.set("k", serde_json::json!(2), "generative").await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(serde_json::json!(2)));
        let info = cache.info("k").await.unwrap().unwrap();
        assert_eq!(info.source, "generative");
        assert_eq!(info.age_hours, 0.0);
    }

    #[tokio::test]
    async fn invalidate_single_and_all() {
        let cache = cache_with(ManualClock::new());
        cache.set("a", serde_json::json!(1), "s").await.unwrap();
        cache.set("b", serde_json::json!(2), "s").await.unwrap();

        cache.invalidate(Some("a")).await.unwrap();
        assert!(cache.get("a").await.unwrap().is_none());
        assert!(cache.get("b").await.unwrap().is_some());

        cache.invalidate(None).await.unwrap();
        assert!(cache.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn custom_ttl() {
        let clock = ManualClock::new();
        let cache = cache_with(clock.clone()).with_ttl_hours(1);
        cache.set("k", serde_json::json!(true), "s").await.unwrap();
        clock.advance(Duration::minutes(61));
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn info_missing_key() {
        let cache = cache_with(ManualClock::new());
        assert!(cache.info("nope").await.unwrap().is_none());
    }
}
