//! # Owned-Row Writes
//!
//! Every mutation the sync engine performs against the host library goes
//! through a [`LibraryTransaction`]. Reads that decide whether to insert
//! happen on the same transaction as the insert itself, so an existence check
//! and the write it guards can never interleave with another writer.
//!
//! Rows are always matched on `owner = ?` plus `external_id`. Host-native rows
//! (`owner IS NULL`) are invisible to every statement in this module.

use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, query_scalar, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{LibraryError, Result};
use crate::models::{
    AlbumArtistLink, AlbumKey, ArtistKey, ExternalKey, NewAlbum, NewArtist, NewSong, PathKey,
    SongArtistLink, SongKey,
};

/// Name of the contributor role songs are linked under.
pub const ARTIST_ROLE: &str = "Artist";

/// Rows removed by [`LibraryTransaction::delete_owned`], per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearedCounts {
    pub song_artists: u64,
    pub album_artists: u64,
    pub songs: u64,
    pub albums: u64,
    pub artists: u64,
    pub paths: u64,
}

impl ClearedCounts {
    pub fn total(&self) -> u64 {
        self.song_artists + self.album_artists + self.songs + self.albums + self.artists + self.paths
    }
}

/// A write transaction against the host library.
///
/// Dropping without [`commit`](Self::commit) rolls back.
pub struct LibraryTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl LibraryTransaction {
    pub async fn begin(pool: &SqlitePool) -> Result<Self> {
        let tx = pool.begin().await?;
        Ok(Self { tx })
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// The owned artist for `key` and the name stored on it.
    pub async fn find_artist(&mut self, key: &ExternalKey) -> Result<Option<(ArtistKey, String)>> {
        let row = query_as::<_, (i64, String)>(
            "SELECT id, name FROM artists WHERE external_id = ? AND owner = ?",
        )
        .bind(key.to_string())
        .bind(key.namespace())
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(|(id, name)| (ArtistKey(id), name)))
    }

    /// The owned album for `key` with its stored title and year.
    pub async fn find_album(
        &mut self,
        key: &ExternalKey,
    ) -> Result<Option<(AlbumKey, String, Option<i32>)>> {
        let row = query_as::<_, (i64, String, Option<i32>)>(
            "SELECT id, title, year FROM albums WHERE external_id = ? AND owner = ?",
        )
        .bind(key.to_string())
        .bind(key.namespace())
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(|(id, title, year)| (AlbumKey(id), title, year)))
    }

    /// The owned song for `key` with the directory and file name it was
    /// recorded under.
    pub async fn find_song(
        &mut self,
        key: &ExternalKey,
    ) -> Result<Option<(SongKey, String, String)>> {
        let row = query_as::<_, (i64, String, String)>(
            r#"
            SELECT s.id, p.path, s.file_name
            FROM songs s
            JOIN paths p ON p.id = s.path_id
            WHERE s.external_id = ? AND s.owner = ?
            "#,
        )
        .bind(key.to_string())
        .bind(key.namespace())
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(|(id, path, file_name)| (SongKey(id), path, file_name)))
    }

    /// The position-0 artist linked to an owned album, with the display name
    /// stored on the link.
    pub async fn primary_album_artist(
        &mut self,
        album: AlbumKey,
        owner: &str,
    ) -> Result<Option<(ArtistKey, String)>> {
        let row = query_as::<_, (i64, String)>(
            r#"
            SELECT artist_id, artist_name FROM album_artists
            WHERE album_id = ? AND owner = ?
            ORDER BY position ASC
            LIMIT 1
            "#,
        )
        .bind(album)
        .bind(owner)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(|(id, name)| (ArtistKey(id), name)))
    }

    /// Id of the host's `Artist` contributor role.
    pub async fn artist_role_id(&mut self) -> Result<i64> {
        let id = query_scalar::<_, i64>("SELECT id FROM roles WHERE name = ?")
            .bind(ARTIST_ROLE)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(id.unwrap_or(1))
    }

    // =========================================================================
    // Inserts
    // =========================================================================

    pub async fn insert_artist(&mut self, artist: &NewArtist) -> Result<ArtistKey> {
        artist.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Artist".to_string(),
            message: e,
        })?;

        let result = query(
            r#"
            INSERT INTO artists (name, sort_name, genres, external_id, owner, date_added)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&artist.name)
        .bind(&artist.sort_name)
        .bind(&artist.genres)
        .bind(artist.external_key.to_string())
        .bind(artist.external_key.namespace())
        .bind(artist.date_added)
        .execute(&mut *self.tx)
        .await?;

        let key = ArtistKey(result.last_insert_rowid());
        debug!(artist_id = %key, external_id = %artist.external_key, "Inserted artist");
        Ok(key)
    }

    pub async fn insert_album(&mut self, album: &NewAlbum) -> Result<AlbumKey> {
        album.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Album".to_string(),
            message: e,
        })?;

        let result = query(
            r#"
            INSERT INTO albums (title, artist_display, year, genres, external_id, owner, date_added)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&album.title)
        .bind(&album.artist_display)
        .bind(album.year)
        .bind(&album.genres)
        .bind(album.external_key.to_string())
        .bind(album.external_key.namespace())
        .bind(album.date_added)
        .execute(&mut *self.tx)
        .await?;

        let key = AlbumKey(result.last_insert_rowid());
        debug!(album_id = %key, external_id = %album.external_key, "Inserted album");
        Ok(key)
    }

    pub async fn insert_album_artist_link(
        &mut self,
        link: &AlbumArtistLink,
        owner: &str,
    ) -> Result<()> {
        query(
            r#"
            INSERT INTO album_artists (artist_id, album_id, position, artist_name, owner)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(link.artist_id)
        .bind(link.album_id)
        .bind(link.position)
        .bind(&link.artist_name)
        .bind(owner)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    pub async fn insert_song(&mut self, song: &NewSong) -> Result<SongKey> {
        song.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Song".to_string(),
            message: e,
        })?;

        let result = query(
            r#"
            INSERT INTO songs (
                album_id, path_id, title, artist_display, track, duration, year,
                genres, file_name, bit_rate, sample_rate, channels,
                external_id, owner, date_added
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(song.album_id)
        .bind(song.path_id)
        .bind(&song.title)
        .bind(&song.artist_display)
        .bind(song.track)
        .bind(song.duration)
        .bind(song.year)
        .bind(&song.genres)
        .bind(&song.file_name)
        .bind(song.bit_rate)
        .bind(song.sample_rate)
        .bind(song.channels)
        .bind(song.external_key.to_string())
        .bind(song.external_key.namespace())
        .bind(song.date_added)
        .execute(&mut *self.tx)
        .await?;

        let key = SongKey(result.last_insert_rowid());
        debug!(song_id = %key, external_id = %song.external_key, "Inserted song");
        Ok(key)
    }

    pub async fn insert_song_artist_link(
        &mut self,
        link: &SongArtistLink,
        owner: &str,
    ) -> Result<()> {
        query(
            r#"
            INSERT INTO song_artists (artist_id, song_id, role_id, position, artist_name, owner)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(link.artist_id)
        .bind(link.song_id)
        .bind(link.role_id)
        .bind(link.position)
        .bind(&link.artist_name)
        .bind(owner)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Returns the owned `paths` row for `path`, inserting it if needed.
    pub async fn get_or_create_path(&mut self, path: &str, owner: &str) -> Result<PathKey> {
        let existing = query_scalar::<_, i64>("SELECT id FROM paths WHERE path = ? AND owner = ?")
            .bind(path)
            .bind(owner)
            .fetch_optional(&mut *self.tx)
            .await?;

        if let Some(id) = existing {
            return Ok(PathKey(id));
        }

        let result = query("INSERT INTO paths (path, hash, owner) VALUES (?, NULL, ?)")
            .bind(path)
            .bind(owner)
            .execute(&mut *self.tx)
            .await?;

        Ok(PathKey(result.last_insert_rowid()))
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Delete every row tagged with `owner`, join rows first so no statement
    /// leaves a dangling reference.
    pub async fn delete_owned(&mut self, owner: &str) -> Result<ClearedCounts> {
        let mut counts = ClearedCounts::default();

        counts.song_artists = self.delete_from("song_artists", owner).await?;
        counts.album_artists = self.delete_from("album_artists", owner).await?;
        counts.songs = self.delete_from("songs", owner).await?;
        counts.albums = self.delete_from("albums", owner).await?;
        counts.artists = self.delete_from("artists", owner).await?;
        counts.paths = self.delete_from("paths", owner).await?;

        Ok(counts)
    }

    async fn delete_from(&mut self, table: &'static str, owner: &str) -> Result<u64> {
        let sql = format!("DELETE FROM {} WHERE owner = ?", table);
        let result = query(&sql).bind(owner).execute(&mut *self.tx).await?;
        debug!(table, rows = result.rows_affected(), "Deleted owned rows");
        Ok(result.rows_affected())
    }
}
