//! Artist repository trait and implementation

use crate::error::Result;
use crate::models::{ArtistKey, ExternalKey, LocalArtist};
use async_trait::async_trait;
use sqlx::{query_as, query_scalar, SqlitePool};

/// Artist repository interface for read access
#[async_trait]
pub trait ArtistRepository: Send + Sync {
    /// Find an artist by its row id
    ///
    /// # Returns
    /// - `Ok(Some(artist))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: ArtistKey) -> Result<Option<LocalArtist>>;

    /// Find the owned artist carrying `key`
    async fn find_by_external_key(&self, key: &ExternalKey) -> Result<Option<LocalArtist>>;

    /// Find artists by exact name, owned or not
    async fn find_by_name(&self, name: &str) -> Result<Vec<LocalArtist>>;

    /// Count all artists
    async fn count(&self) -> Result<i64>;

    /// Count artists tagged with `owner`
    async fn count_owned(&self, owner: &str) -> Result<i64>;
}

/// SQLite implementation of ArtistRepository
pub struct SqliteArtistRepository {
    pool: SqlitePool,
}

impl SqliteArtistRepository {
    /// Create a new SqliteArtistRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtistRepository for SqliteArtistRepository {
    async fn find_by_id(&self, id: ArtistKey) -> Result<Option<LocalArtist>> {
        let artist = query_as::<_, LocalArtist>("SELECT * FROM artists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(artist)
    }

    async fn find_by_external_key(&self, key: &ExternalKey) -> Result<Option<LocalArtist>> {
        let artist = query_as::<_, LocalArtist>(
            "SELECT * FROM artists WHERE external_id = ? AND owner = ?",
        )
        .bind(key.to_string())
        .bind(key.namespace())
        .fetch_optional(&self.pool)
        .await?;

        Ok(artist)
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<LocalArtist>> {
        let artists = query_as::<_, LocalArtist>("SELECT * FROM artists WHERE name = ? ORDER BY id")
            .bind(name)
            .fetch_all(&self.pool)
            .await?;

        Ok(artists)
    }

    async fn count(&self) -> Result<i64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM artists")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn count_owned(&self, owner: &str) -> Result<i64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM artists WHERE owner = ?")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
