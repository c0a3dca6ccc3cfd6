//! SQLite-backed [`SettingsStore`]
//!
//! Lives in its own database file (by default `sync-settings.db` beside the
//! host library) so clearing or replacing the library never loses engine
//! state by accident.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::debug;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS engine_settings (
    key        TEXT PRIMARY KEY,
    text_value TEXT,
    int_value  INTEGER,
    updated_at INTEGER NOT NULL,
    CHECK ((text_value IS NULL) <> (int_value IS NULL))
)";

fn db_error(action: &str, key: &str, error: sqlx::Error) -> BridgeError {
    BridgeError::OperationFailed(format!("settings: failed to {} '{}': {}", action, key, error))
}

pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    /// Opens (creating if needed) the settings database at `path`.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .map_err(|e| db_error("open", &path.display().to_string(), e))?;

        let store = Self::with_pool(pool).await?;
        debug!(path = %path.display(), "Opened settings store");
        Ok(store)
    }

    /// Private in-memory database. One connection, since each `:memory:`
    /// connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| db_error("open", ":memory:", e))?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| db_error("create", "engine_settings", e))?;
        Ok(Self { pool })
    }

    async fn upsert(&self, key: &str, text: Option<&str>, int: Option<i64>) -> Result<()> {
        sqlx::query(
            "INSERT INTO engine_settings (key, text_value, int_value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                 text_value = excluded.text_value,
                 int_value = excluded.int_value,
                 updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(text)
        .bind(int)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("write", key, e))?;
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Option<(Option<String>, Option<i64>)>> {
        sqlx::query_as("SELECT text_value, int_value FROM engine_settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("read", key, e))
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.fetch(key).await? {
            None => Ok(None),
            Some((Some(text), _)) => Ok(Some(text)),
            Some((None, _)) => Err(BridgeError::Malformed(format!(
                "setting '{}' holds an integer, not a string",
                key
            ))),
        }
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.upsert(key, Some(value), None).await
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.fetch(key).await? {
            None => Ok(None),
            Some((_, Some(int))) => Ok(Some(int)),
            Some((_, None)) => Err(BridgeError::Malformed(format!(
                "setting '{}' holds a string, not an integer",
                key
            ))),
        }
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.upsert(key, None, Some(value)).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let removed = sqlx::query("DELETE FROM engine_settings WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete", key, e))?
            .rows_affected();
        debug!(key, removed, "Deleted setting");
        Ok(())
    }
}
