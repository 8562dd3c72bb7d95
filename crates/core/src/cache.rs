//! Cache store trait: passive key/value rows with source provenance.
//!
//! A store only persists rows. Freshness (TTL) is decided by the caller
//! on read, so expired rows stay visible for inspection until they are
//! explicitly invalidated or overwritten.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A single cached row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Caller-constructed key, e.g. `game:valorant:meta`
    pub key: String,

    /// Arbitrary structured payload
    pub data: serde_json::Value,

    /// Which resolution layer produced the payload
    pub source: String,

    /// When the row was last written
    pub updated_at: DateTime<Utc>,
}

/// Storage backend for cache rows.
///
/// Implementations must be safe for concurrent upsert-by-key.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// A human-readable backend name.
    fn name(&self) -> &str;

    /// Fetch a row regardless of age.
    async fn load(&self, key: &str) -> Result<Option<CacheEntry>, StoreError>;

    /// Insert or overwrite the row for `entry.key`.
    async fn upsert(&self, entry: CacheEntry) -> Result<(), StoreError>;

    /// Delete a single row. Returns whether a row existed.
    async fn remove(&self, key: &str) -> Result<bool, StoreError>;

    /// Delete every row.
    async fn clear(&self) -> Result<(), StoreError>;

    /// All rows, ordered by key.
    async fn entries(&self) -> Result<Vec<CacheEntry>, StoreError>;
}
