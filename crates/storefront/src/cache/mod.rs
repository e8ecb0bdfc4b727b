//! Local durable product cache.
//!
//! # Storage: `SQLite`
//!
//! A single-writer structured store holding the last catalog snapshot fetched
//! from the backend, so the next start can render before the network answers.
//!
//! ## Tables
//!
//! - `metadata` - Key/value facts about the cache (schema version 1)
//! - `products` - One JSON record per product, keyed by id (schema version 2)
//!
//! # Versioning
//!
//! The schema version lives in `PRAGMA user_version`. Opening a store with a
//! lower version creates whatever tables are missing. A store with a higher
//! version than this client understands, or one that cannot be opened at all,
//! is destroyed and recreated empty.
//!
//! Writes are full replacements: [`ProductCache::replace_all`] deletes every
//! record and inserts the new snapshot in one transaction.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use shopfront_core::{ProductId, ProductRecord};

/// Schema version written by this client.
pub const SCHEMA_VERSION: i64 = 2;

const META_POPULATED_AT: &str = "populated_at";

/// Errors raised by the local product cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache schema version {found} is newer than supported version {supported}")]
    VersionMismatch { found: i64, supported: i64 },
}

/// Where the cache lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLocation {
    /// `SQLite` database file, created if missing.
    File(PathBuf),
    /// Private in-memory database; lives as long as the [`ProductCache`].
    Memory,
}

impl CacheLocation {
    /// File location when a path is given, in-memory otherwise.
    #[must_use]
    pub fn from_path(path: Option<&Path>) -> Self {
        path.map_or(Self::Memory, |p| Self::File(p.to_path_buf()))
    }
}

/// Local product cache backed by `SQLite`.
#[derive(Debug, Clone)]
pub struct ProductCache {
    pool: SqlitePool,
    location: CacheLocation,
}

impl ProductCache {
    /// Open the cache, migrating older schemas and recreating the store when
    /// it is unusable.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot be opened even after being
    /// destroyed and recreated.
    #[instrument(skip_all, fields(location = ?location))]
    pub async fn open(location: CacheLocation) -> Result<Self, CacheError> {
        match Self::try_open(&location).await {
            Ok(cache) => Ok(cache),
            Err(e) => {
                warn!(error = %e, "product cache unusable, recreating");
                destroy(&location).await?;
                Self::try_open(&location).await
            }
        }
    }

    async fn try_open(location: &CacheLocation) -> Result<Self, CacheError> {
        let pool = connect(location).await?;

        let found: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&pool)
            .await?;

        if found > SCHEMA_VERSION {
            pool.close().await;
            return Err(CacheError::VersionMismatch {
                found,
                supported: SCHEMA_VERSION,
            });
        }
        if found < SCHEMA_VERSION {
            migrate(&pool, found).await?;
        }

        Ok(Self {
            pool,
            location: location.clone(),
        })
    }

    /// Where this cache lives.
    #[must_use]
    pub const fn location(&self) -> &CacheLocation {
        &self.location
    }

    /// Schema version recorded in the store.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Database` if the pragma cannot be read.
    pub async fn schema_version(&self) -> Result<i64, CacheError> {
        Ok(sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?)
    }

    /// Read every cached record in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a record does not decode.
    pub async fn read_all(&self) -> Result<Vec<ProductRecord>, CacheError> {
        let rows: Vec<String> = sqlx::query_scalar("SELECT record FROM products ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|raw| serde_json::from_str(raw).map_err(CacheError::from))
            .collect()
    }

    /// Number of cached records.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Database` if the query fails.
    pub async fn count(&self) -> Result<usize, CacheError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Replace the whole cache with `records`.
    ///
    /// Records without an id are stored under a freshly generated one.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; the previous contents are
    /// then left untouched.
    #[instrument(skip_all, fields(count = records.len()))]
    pub async fn replace_all(&self, records: &[ProductRecord]) -> Result<(), CacheError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM products").execute(&mut *tx).await?;

        for record in records {
            let id = record.id.clone().unwrap_or_else(ProductId::generate);
            let stored = ProductRecord {
                id: Some(id.clone()),
                ..record.clone()
            };
            sqlx::query("INSERT OR REPLACE INTO products (id, record) VALUES (?, ?)")
                .bind(id.as_str())
                .bind(serde_json::to_string(&stored)?)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)")
            .bind(META_POPULATED_AT)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!("product cache replaced");
        Ok(())
    }

    /// Remove every cached record.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Database` if the delete fails.
    pub async fn clear(&self) -> Result<(), CacheError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM products").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM metadata WHERE key = ?")
            .bind(META_POPULATED_AT)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// When the cache was last populated.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Database` if the query fails.
    pub async fn populated_at(&self) -> Result<Option<DateTime<Utc>>, CacheError> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM metadata WHERE key = ?")
            .bind(META_POPULATED_AT)
            .fetch_optional(&self.pool)
            .await?;

        Ok(raw
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|t| t.with_timezone(&Utc)))
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// =============================================================================
// Connection and Schema
// =============================================================================

async fn connect(location: &CacheLocation) -> Result<SqlitePool, CacheError> {
    match location {
        CacheLocation::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);
            Ok(SqlitePoolOptions::new()
                .max_connections(4)
                .acquire_timeout(Duration::from_secs(5))
                .connect_with(options)
                .await?)
        }
        CacheLocation::Memory => {
            // Every in-memory connection is its own database, so pin exactly one
            let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
            Ok(SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?)
        }
    }
}

/// Bring a store at `from` up to [`SCHEMA_VERSION`]. Every step is idempotent.
async fn migrate(pool: &SqlitePool, from: i64) -> Result<(), CacheError> {
    info!(from, to = SCHEMA_VERSION, "migrating product cache schema");
    let mut tx = pool.begin().await?;

    if from < 1 {
        sqlx::query("CREATE TABLE IF NOT EXISTS metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)")
            .execute(&mut *tx)
            .await?;
    }
    if from < 2 {
        sqlx::query("CREATE TABLE IF NOT EXISTS products (id TEXT PRIMARY KEY, record TEXT NOT NULL)")
            .execute(&mut *tx)
            .await?;
    }

    // PRAGMA does not accept bound parameters
    sqlx::query(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Delete a store so it can be recreated from scratch.
async fn destroy(location: &CacheLocation) -> Result<(), CacheError> {
    let CacheLocation::File(path) = location else {
        // A failed in-memory database is discarded with its pool
        return Ok(());
    };

    for suffix in ["", "-wal", "-shm", "-journal"] {
        let mut target = path.clone().into_os_string();
        target.push(suffix);
        match tokio::fs::remove_file(&target).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(id: Option<&str>, name: &str) -> ProductRecord {
        let mut value = json!({ "name": name, "price": "10.00", "category": "tents" });
        if let Some(id) = id {
            value["_id"] = json!(id);
        }
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_fresh_store_is_migrated_and_empty() {
        let cache = ProductCache::open(CacheLocation::Memory).await.unwrap();
        assert_eq!(cache.schema_version().await.unwrap(), SCHEMA_VERSION);
        assert!(cache.read_all().await.unwrap().is_empty());
        assert!(cache.populated_at().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_all_is_full_replacement() {
        let cache = ProductCache::open(CacheLocation::Memory).await.unwrap();

        cache
            .replace_all(&[record(Some("a"), "A"), record(Some("b"), "B"), record(Some("c"), "C")])
            .await
            .unwrap();
        assert_eq!(cache.count().await.unwrap(), 3);

        cache
            .replace_all(&[record(Some("d"), "D"), record(Some("e"), "E")])
            .await
            .unwrap();
        let names: Vec<String> = cache
            .read_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["D", "E"]);
        assert!(cache.populated_at().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_records_without_id_get_generated_ids() {
        let cache = ProductCache::open(CacheLocation::Memory).await.unwrap();
        cache
            .replace_all(&[record(None, "X"), record(None, "Y")])
            .await
            .unwrap();

        let stored = cache.read_all().await.unwrap();
        assert_eq!(stored.len(), 2);
        let ids: Vec<ProductId> = stored.into_iter().map(|r| r.id.unwrap()).collect();
        assert_ne!(ids[0], ids[1]);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = ProductCache::open(CacheLocation::Memory).await.unwrap();
        cache.replace_all(&[record(Some("a"), "A")]).await.unwrap();
        cache.clear().await.unwrap();
        assert_eq!(cache.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let location = CacheLocation::File(dir.path().join("cache.sqlite"));

        let cache = ProductCache::open(location.clone()).await.unwrap();
        cache.replace_all(&[record(Some("a"), "A")]).await.unwrap();
        cache.close().await;

        let reopened = ProductCache::open(location).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_version_one_store_is_migrated_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");

        // Simulate a store written by a client that only knew `metadata`
        let pool = connect(&CacheLocation::File(path.clone())).await.unwrap();
        sqlx::query("CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO metadata (key, value) VALUES ('owner', 'kept')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("PRAGMA user_version = 1").execute(&pool).await.unwrap();
        pool.close().await;

        let cache = ProductCache::open(CacheLocation::File(path)).await.unwrap();
        assert_eq!(cache.schema_version().await.unwrap(), SCHEMA_VERSION);
        assert_eq!(cache.count().await.unwrap(), 0);

        let owner: String = sqlx::query_scalar("SELECT value FROM metadata WHERE key = 'owner'")
            .fetch_one(&cache.pool)
            .await
            .unwrap();
        assert_eq!(owner, "kept");
    }

    #[tokio::test]
    async fn test_newer_store_is_destroyed_and_recreated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");

        let cache = ProductCache::open(CacheLocation::File(path.clone())).await.unwrap();
        cache.replace_all(&[record(Some("a"), "A")]).await.unwrap();
        sqlx::query("PRAGMA user_version = 99")
            .execute(&cache.pool)
            .await
            .unwrap();
        cache.close().await;

        let recreated = ProductCache::open(CacheLocation::File(path)).await.unwrap();
        assert_eq!(recreated.schema_version().await.unwrap(), SCHEMA_VERSION);
        assert_eq!(recreated.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_recreated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        // Large enough that SQLite reads a page and rejects the header
        std::fs::write(&path, vec![0xAB_u8; 8192]).unwrap();

        let cache = ProductCache::open(CacheLocation::File(path)).await.unwrap();
        assert_eq!(cache.count().await.unwrap(), 0);
    }
}
