//! SQLite cache store.
//!
//! A single `cache` table keyed by the caller-constructed cache key.
//! Payloads are stored as JSON text and timestamps as RFC 3339.

use async_trait::async_trait;
use chrono::Utc;
use nexus_core::cache::{CacheEntry, CacheStore};
use nexus_core::error::StoreError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A persistent SQLite-backed cache store.
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl SqliteCacheStore {
    /// Open (or create) the database at `path` and run migrations.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Each connection to an in-memory database sees its own empty database.
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite cache store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache (
                key         TEXT PRIMARY KEY,
                data        TEXT NOT NULL,
                source      TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("cache table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<CacheEntry, StoreError> {
        let key: String = row
            .try_get("key")
            .map_err(|e| StoreError::QueryFailed(format!("key column: {e}")))?;
        let data_json: String = row
            .try_get("data")
            .map_err(|e| StoreError::QueryFailed(format!("data column: {e}")))?;
        let source: String = row
            .try_get("source")
            .map_err(|e| StoreError::QueryFailed(format!("source column: {e}")))?;
        let updated_at_str: String = row
            .try_get("updated_at")
            .map_err(|e| StoreError::QueryFailed(format!("updated_at column: {e}")))?;

        let data = serde_json::from_str(&data_json)
            .map_err(|e| StoreError::QueryFailed(format!("data for {key} is not JSON: {e}")))?;

        let updated_at = chrono::DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::QueryFailed(format!("updated_at for {key}: {e}")))?;

        Ok(CacheEntry {
            key,
            data,
            source,
            updated_at,
        })
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn load(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let row = sqlx::query("SELECT * FROM cache WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("GET by key: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_entry(r)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, entry: CacheEntry) -> Result<(), StoreError> {
        let data_json = serde_json::to_string(&entry.data)
            .map_err(|e| StoreError::Storage(format!("Data serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO cache (key, data, source, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                data = excluded.data,
                source = excluded.source,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&entry.key)
        .bind(&data_json)
        .bind(&entry.source)
        .bind(entry.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPSERT failed: {e}")))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM cache WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cache")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("CLEAR failed: {e}")))?;

        Ok(())
    }

    async fn entries(&self) -> Result<Vec<CacheEntry>, StoreError> {
        let rows = sqlx::query("SELECT * FROM cache ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("LIST: {e}")))?;

        rows.iter().map(Self::row_to_entry).collect()
    }
}
