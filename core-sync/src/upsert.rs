//! # Identity Mapping and Upsert
//!
//! Maps one remote entity onto exactly one owned local row.
//!
//! Each upsert runs in its own [`LibraryTransaction`]: the existence check on
//! the namespaced external key and the insert it guards share the
//! transaction, and an album or song is inserted together with its artist
//! link or not at all. Existing rows are returned untouched; remote metadata
//! drift is never merged into them.

use bridge_traits::{
    catalog::{RemoteAlbum, RemoteArtist, RemoteSong},
    time::Clock,
};
use core_library::{
    models::encode_track_number, AlbumArtistLink, AlbumKey, ArtistKey, ExternalKey,
    LibraryTransaction, NewAlbum, NewArtist, NewSong, SongArtistLink, SongKey,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{Result, SyncError};
use crate::materializer::{SongLocation, UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_TITLE};

/// Channel count recorded for streamed songs; the catalog does not report it.
const DEFAULT_CHANNELS: i64 = 2;

/// The row an upsert landed on and whether this call created it.
///
/// `row` always reflects what is stored, which may differ from the remote
/// entity when the row predates a metadata change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted<R> {
    pub row: R,
    pub created: bool,
}

impl<R> Upserted<R> {
    fn existing(row: R) -> Self {
        Self {
            row,
            created: false,
        }
    }

    fn created(row: R) -> Self {
        Self { row, created: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtist {
    pub key: ArtistKey,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAlbum {
    pub key: AlbumKey,
    pub title: String,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSong {
    pub key: SongKey,
    pub location: SongLocation,
}

/// Writes owned artist/album/song rows for one source namespace.
#[derive(Clone)]
pub struct UpsertEngine {
    pool: SqlitePool,
    namespace: String,
    clock: Arc<dyn Clock>,
}

impl UpsertEngine {
    pub fn new(pool: SqlitePool, namespace: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
            clock,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn key_for(&self, entity: &'static str, remote_id: &str) -> Result<ExternalKey> {
        if remote_id.trim().is_empty() {
            return Err(SyncError::MalformedRecord {
                entity,
                id: String::new(),
                reason: "missing id".to_string(),
            });
        }
        Ok(ExternalKey::new(&self.namespace, remote_id))
    }

    async fn begin(&self, entity: &'static str, id: &str) -> Result<LibraryTransaction> {
        LibraryTransaction::begin(&self.pool)
            .await
            .map_err(|e| SyncError::from_store(e, entity, id))
    }

    /// Whether an owned album already exists for `remote_id`.
    pub async fn album_exists(&self, remote_id: &str) -> Result<bool> {
        let key = self.key_for("album", remote_id)?;
        let mut tx = self.begin("album", remote_id).await?;
        let found = tx
            .find_album(&key)
            .await
            .map_err(|e| SyncError::from_store(e, "album", remote_id))?;
        tx.rollback()
            .await
            .map_err(|e| SyncError::from_store(e, "album", remote_id))?;
        Ok(found.is_some())
    }

    #[instrument(skip(self, remote), fields(artist_id = %remote.id))]
    pub async fn upsert_artist(&self, remote: &RemoteArtist) -> Result<Upserted<StoredArtist>> {
        let key = self.key_for("artist", &remote.id)?;
        let store = |e| SyncError::from_store(e, "artist", &remote.id);

        let mut tx = self.begin("artist", &remote.id).await?;
        if let Some((key, name)) = tx.find_artist(&key).await.map_err(store)? {
            tx.rollback().await.map_err(store)?;
            return Ok(Upserted::existing(StoredArtist { key, name }));
        }

        let artist = NewArtist {
            external_key: key,
            name: display_or(&remote.name, UNKNOWN_ARTIST),
            sort_name: remote.sort_name.clone().filter(|s| !s.trim().is_empty()),
            genres: join_genres(&remote.genres),
            date_added: self.clock.unix_timestamp(),
        };
        let id = tx.insert_artist(&artist).await.map_err(store)?;
        tx.commit().await.map_err(store)?;

        debug!(local_id = %id, name = %artist.name, "Created artist");
        Ok(Upserted::created(StoredArtist {
            key: id,
            name: artist.name,
        }))
    }

    /// Insert the album and its position-0 artist link together.
    #[instrument(skip(self, remote, artist_name), fields(album_id = %remote.id))]
    pub async fn upsert_album(
        &self,
        remote: &RemoteAlbum,
        artist: ArtistKey,
        artist_name: &str,
    ) -> Result<Upserted<StoredAlbum>> {
        let key = self.key_for("album", &remote.id)?;
        let store = |e| SyncError::from_store(e, "album", &remote.id);

        let mut tx = self.begin("album", &remote.id).await?;
        if let Some((key, title, year)) = tx.find_album(&key).await.map_err(store)? {
            tx.rollback().await.map_err(store)?;
            return Ok(Upserted::existing(StoredAlbum { key, title, year }));
        }

        let artist_display = remote
            .artist
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(artist_name);
        let album = NewAlbum {
            external_key: key,
            title: display_or(&remote.name, UNKNOWN_ALBUM),
            artist_display: display_or(artist_display, UNKNOWN_ARTIST),
            year: remote.year.filter(|y| *y > 0),
            genres: remote.genre.clone().filter(|g| !g.trim().is_empty()),
            date_added: self.clock.unix_timestamp(),
        };
        let id = tx.insert_album(&album).await.map_err(store)?;

        let link = AlbumArtistLink {
            artist_id: artist,
            album_id: id,
            position: 0,
            artist_name: display_or(artist_name, UNKNOWN_ARTIST),
        };
        tx.insert_album_artist_link(&link, &self.namespace)
            .await
            .map_err(store)?;
        tx.commit().await.map_err(store)?;

        debug!(local_id = %id, title = %album.title, "Created album");
        Ok(Upserted::created(StoredAlbum {
            key: id,
            title: album.title,
            year: album.year,
        }))
    }

    /// Insert the song, its path row and its artist link together.
    ///
    /// The link targets the album's primary artist, so the album must have
    /// been created by this engine. An existing song keeps the location it
    /// was first recorded under; `location` only applies to new rows.
    #[instrument(skip(self, remote, location), fields(song_id = %remote.id))]
    pub async fn upsert_song(
        &self,
        remote: &RemoteSong,
        album: AlbumKey,
        location: &SongLocation,
    ) -> Result<Upserted<StoredSong>> {
        let key = self.key_for("song", &remote.id)?;
        let store = |e| SyncError::from_store(e, "song", &remote.id);

        let mut tx = self.begin("song", &remote.id).await?;
        if let Some((key, directory, file_name)) = tx.find_song(&key).await.map_err(store)? {
            tx.rollback().await.map_err(store)?;
            return Ok(Upserted::existing(StoredSong {
                key,
                location: SongLocation {
                    directory,
                    file_name,
                },
            }));
        }

        let (artist_id, artist_name) = tx
            .primary_album_artist(album, &self.namespace)
            .await
            .map_err(store)?
            .ok_or_else(|| {
                SyncError::StoreIntegrity(format!(
                    "album {} has no owned artist link (song {})",
                    album, remote.id
                ))
            })?;
        let role_id = tx.artist_role_id().await.map_err(store)?;
        let path_id = tx
            .get_or_create_path(&location.directory, &self.namespace)
            .await
            .map_err(store)?;

        let artist_display = remote
            .artist
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(&artist_name);
        let song = NewSong {
            external_key: key,
            album_id: album,
            path_id,
            title: display_or(&remote.title, UNKNOWN_TITLE),
            artist_display: display_or(artist_display, UNKNOWN_ARTIST),
            track: encode_track_number(remote.disc_number.unwrap_or(1), remote.track.unwrap_or(0)),
            duration: i64::from(remote.duration.unwrap_or(0)),
            year: remote.year.filter(|y| *y > 0),
            genres: remote.genre.clone().filter(|g| !g.trim().is_empty()),
            file_name: location.file_name.clone(),
            bit_rate: remote.bit_rate.map(i64::from),
            sample_rate: remote.sample_rate.map(i64::from),
            channels: DEFAULT_CHANNELS,
            date_added: self.clock.unix_timestamp(),
        };
        let id = tx.insert_song(&song).await.map_err(store)?;

        let link = SongArtistLink {
            artist_id,
            song_id: id,
            role_id,
            position: 0,
            artist_name,
        };
        tx.insert_song_artist_link(&link, &self.namespace)
            .await
            .map_err(store)?;
        tx.commit().await.map_err(store)?;

        debug!(local_id = %id, title = %song.title, "Created song");
        Ok(Upserted::created(StoredSong {
            key: id,
            location: location.clone(),
        }))
    }
}

fn display_or(value: &str, fallback: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

fn join_genres(genres: &[String]) -> Option<String> {
    let genres: Vec<&str> = genres
        .iter()
        .map(|g| g.trim())
        .filter(|g| !g.is_empty())
        .collect();
    (!genres.is_empty()).then(|| genres.join(" / "))
}
