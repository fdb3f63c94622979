use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Row, SqlitePool};

use super::MIGRATION_001_REFERENCE_DATA;

/// A stored reference blob with its bookkeeping.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Key/value store of JSON reference blobs (fee schedule, FX snapshot,
/// port and location catalogs).
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_REFERENCE_DATA)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Store a blob under `key`, replacing any previous value.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize blob '{}'", key))?;
        self.put_raw(key, &json).await
    }

    /// Store an already-serialized JSON document under `key`.
    pub async fn put_raw(&self, key: &str, json: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reference_data (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to store blob '{}'", key))?;
        Ok(())
    }

    /// Fetch and decode the blob under `key`; `None` when the key is absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let row = sqlx::query("SELECT value FROM reference_data WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch blob '{}'", key))?;

        match row {
            Some(row) => {
                let json: String = row.get("value");
                let value = serde_json::from_str(&json)
                    .with_context(|| format!("Blob '{}' does not match its expected shape", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Fetch one entry with its update timestamp.
    pub async fn get_entry(&self, key: &str) -> Result<Option<StoredBlob>> {
        let row = sqlx::query("SELECT key, value, updated_at FROM reference_data WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch blob '{}'", key))?;

        row.as_ref().map(Self::row_to_blob).transpose()
    }

    /// List every stored entry, ordered by key.
    pub async fn list_entries(&self) -> Result<Vec<StoredBlob>> {
        let rows = sqlx::query("SELECT key, value, updated_at FROM reference_data ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list reference data")?;

        rows.iter().map(Self::row_to_blob).collect()
    }

    /// Remove a key. Returns whether anything was deleted.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reference_data WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete blob '{}'", key))?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_blob(row: &sqlx::sqlite::SqliteRow) -> Result<StoredBlob> {
        let key: String = row.get("key");
        let value_str: String = row.get("value");
        let updated_at_str: String = row.get("updated_at");

        Ok(StoredBlob {
            value: serde_json::from_str(&value_str)
                .with_context(|| format!("Blob '{}' is not valid JSON", key))?,
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .context("Invalid updated_at timestamp")?
                .with_timezone(&Utc),
            key,
        })
    }
}
