//! Album repository trait and implementation

use crate::error::Result;
use crate::models::{AlbumKey, ArtistKey, ExternalKey, LocalAlbum};
use async_trait::async_trait;
use sqlx::{query_as, query_scalar, SqlitePool};

/// Album repository interface for read access
#[async_trait]
pub trait AlbumRepository: Send + Sync {
    async fn find_by_id(&self, id: AlbumKey) -> Result<Option<LocalAlbum>>;

    async fn find_by_external_key(&self, key: &ExternalKey) -> Result<Option<LocalAlbum>>;

    /// Albums linked to `artist` through `album_artists`, ordered by title
    async fn find_by_artist(&self, artist: ArtistKey) -> Result<Vec<LocalAlbum>>;

    async fn count(&self) -> Result<i64>;

    async fn count_owned(&self, owner: &str) -> Result<i64>;
}

/// SQLite implementation of AlbumRepository
pub struct SqliteAlbumRepository {
    pool: SqlitePool,
}

impl SqliteAlbumRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlbumRepository for SqliteAlbumRepository {
    async fn find_by_id(&self, id: AlbumKey) -> Result<Option<LocalAlbum>> {
        let album = query_as::<_, LocalAlbum>("SELECT * FROM albums WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(album)
    }

    async fn find_by_external_key(&self, key: &ExternalKey) -> Result<Option<LocalAlbum>> {
        let album = query_as::<_, LocalAlbum>(
            "SELECT * FROM albums WHERE external_id = ? AND owner = ?",
        )
        .bind(key.to_string())
        .bind(key.namespace())
        .fetch_optional(&self.pool)
        .await?;

        Ok(album)
    }

    async fn find_by_artist(&self, artist: ArtistKey) -> Result<Vec<LocalAlbum>> {
        let albums = query_as::<_, LocalAlbum>(
            r#"
            SELECT a.* FROM albums a
            INNER JOIN album_artists aa ON aa.album_id = a.id
            WHERE aa.artist_id = ?
            ORDER BY a.title ASC
            "#,
        )
        .bind(artist)
        .fetch_all(&self.pool)
        .await?;

        Ok(albums)
    }

    async fn count(&self) -> Result<i64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM albums")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn count_owned(&self, owner: &str) -> Result<i64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM albums WHERE owner = ?")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
