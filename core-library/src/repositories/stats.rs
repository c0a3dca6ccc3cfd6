//! Aggregate counts of owned library content

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sqlx::{query_scalar, SqlitePool};

/// Per-table row counts for one owner tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub artists: i64,
    pub albums: i64,
    pub songs: i64,
    pub paths: i64,
    pub album_artist_links: i64,
    pub song_artist_links: i64,
}

impl LibraryStats {
    pub async fn collect(pool: &SqlitePool, owner: &str) -> Result<Self> {
        Ok(Self {
            artists: count(pool, "artists", owner).await?,
            albums: count(pool, "albums", owner).await?,
            songs: count(pool, "songs", owner).await?,
            paths: count(pool, "paths", owner).await?,
            album_artist_links: count(pool, "album_artists", owner).await?,
            song_artist_links: count(pool, "song_artists", owner).await?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

async fn count(pool: &SqlitePool, table: &'static str, owner: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE owner = ?", table);
    let count = query_scalar::<_, i64>(&sql)
        .bind(owner)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_empty_library() {
        let pool = create_test_pool().await.unwrap();
        let stats = LibraryStats::collect(&pool, "navidrome").await.unwrap();
        assert!(stats.is_empty());
    }

    #[tokio::test]
    async fn test_counts_only_owned_rows() {
        let pool = create_test_pool().await.unwrap();

        sqlx::query("INSERT INTO artists (name, date_added) VALUES ('Host', 0)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO artists (name, external_id, owner, date_added) VALUES ('Synced', 'navidrome://1', 'navidrome', 0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let stats = LibraryStats::collect(&pool, "navidrome").await.unwrap();
        assert_eq!(stats.artists, 1);
        assert_eq!(stats.songs, 0);
        assert!(!stats.is_empty());
    }
}
