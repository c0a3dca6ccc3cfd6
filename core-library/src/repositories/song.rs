//! Song repository trait and implementation

use crate::error::Result;
use crate::models::{AlbumKey, ExternalKey, LocalSong, SongKey};
use async_trait::async_trait;
use sqlx::{query_as, query_scalar, SqlitePool};

/// Song repository interface for read access
#[async_trait]
pub trait SongRepository: Send + Sync {
    async fn find_by_id(&self, id: SongKey) -> Result<Option<LocalSong>>;

    async fn find_by_external_key(&self, key: &ExternalKey) -> Result<Option<LocalSong>>;

    /// Songs on `album` in disc/track order
    async fn find_by_album(&self, album: AlbumKey) -> Result<Vec<LocalSong>>;

    async fn count(&self) -> Result<i64>;

    async fn count_owned(&self, owner: &str) -> Result<i64>;

    /// Owned songs with no matching `song_artists` row or no parent album.
    ///
    /// Always empty when the library is consistent.
    async fn count_orphaned(&self, owner: &str) -> Result<i64>;
}

/// SQLite implementation of SongRepository
pub struct SqliteSongRepository {
    pool: SqlitePool,
}

impl SqliteSongRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SongRepository for SqliteSongRepository {
    async fn find_by_id(&self, id: SongKey) -> Result<Option<LocalSong>> {
        let song = query_as::<_, LocalSong>("SELECT * FROM songs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(song)
    }

    async fn find_by_external_key(&self, key: &ExternalKey) -> Result<Option<LocalSong>> {
        let song = query_as::<_, LocalSong>(
            "SELECT * FROM songs WHERE external_id = ? AND owner = ?",
        )
        .bind(key.to_string())
        .bind(key.namespace())
        .fetch_optional(&self.pool)
        .await?;

        Ok(song)
    }

    async fn find_by_album(&self, album: AlbumKey) -> Result<Vec<LocalSong>> {
        let songs = query_as::<_, LocalSong>(
            "SELECT * FROM songs WHERE album_id = ? ORDER BY track ASC, id ASC",
        )
        .bind(album)
        .fetch_all(&self.pool)
        .await?;

        Ok(songs)
    }

    async fn count(&self) -> Result<i64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM songs")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn count_owned(&self, owner: &str) -> Result<i64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM songs WHERE owner = ?")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn count_orphaned(&self, owner: &str) -> Result<i64> {
        let count = query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM songs s
            WHERE s.owner = ?
              AND (
                NOT EXISTS (SELECT 1 FROM song_artists sa WHERE sa.song_id = s.id)
                OR NOT EXISTS (SELECT 1 FROM albums a WHERE a.id = s.album_id)
              )
            "#,
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
