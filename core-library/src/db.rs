//! # Connection Pool
//!
//! Opens the host media-library database the sync engine writes into.
//!
//! The host (a media center) keeps reading the same file while a sync runs,
//! so connections use WAL journaling and a generous busy timeout: the engine
//! waits for the host's locks instead of failing mid-walk. Foreign keys are
//! enforced so the join tables can never point at a deleted row. Pending
//! migrations from `migrations/` run on open; they only create what is
//! missing and never touch host-native rows.
//!
//! ```rust,ignore
//! use core_library::db::{create_pool, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("/home/media/.kodi/userdata/Database/MyMusic82.db")).await?;
//! let owned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE owner = ?")
//!     .bind("navidrome")
//!     .fetch_one(&pool)
//!     .await?;
//! ```

use crate::{LibraryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where and how to open the library database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `sqlite:<path>` or `sqlite::memory:`
    pub database_url: String,
    pub max_connections: u32,
    /// Wait for a free pooled connection
    pub acquire_timeout: Duration,
    /// Wait for a lock held by another process (usually the host)
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_url: format!("sqlite:{}", database_path.into().display()),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(30),
        }
    }

    /// Private in-memory database for tests.
    ///
    /// Pinned to one connection: every SQLite connection to `:memory:` opens
    /// its own empty database.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

/// Open the pool, apply pending migrations and probe one connection.
///
/// # Errors
///
/// `LibraryError::Database` when the file cannot be opened or the probe
/// fails, `LibraryError::Migration` when the schema cannot be brought up.
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(
        database_url = %config.database_url,
        max_connections = config.max_connections,
        "Opening library database"
    );

    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(LibraryError::Database)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .create_if_missing(true)
        .busy_timeout(config.busy_timeout);

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to open library database");
            LibraryError::Database(e)
        })?;

    run_migrations(&pool).await?;

    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await
        .map_err(LibraryError::Database)?;
    debug!(connections = pool.size(), "Library database ready");

    Ok(pool)
}

/// In-memory pool with the schema applied.
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    create_pool(DatabaseConfig::in_memory()).await
}

async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Migration failed");
            LibraryError::Migration(e.to_string())
        })?;

    info!("Database migrations completed successfully");
    Ok(())
}
