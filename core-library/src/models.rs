//! Domain models for the host media library
//!
//! Row types map the tables in `migrations/` one to one. `New*` types carry
//! the values for an insert and validate them before they reach SQL.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

// =============================================================================
// ID Types
// =============================================================================

macro_rules! row_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_key!(
    /// Row id in `artists`
    ArtistKey
);
row_key!(
    /// Row id in `albums`
    AlbumKey
);
row_key!(
    /// Row id in `songs`
    SongKey
);
row_key!(
    /// Row id in `paths`
    PathKey
);

/// Namespaced identity of a remote entity: `"<namespace>://<remote_id>"`.
///
/// The namespace doubles as the `owner` tag on every row the engine writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalKey {
    namespace: String,
    remote_id: String,
}

impl ExternalKey {
    pub fn new(namespace: impl Into<String>, remote_id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            remote_id: remote_id.into(),
        }
    }

    /// Parse a rendered key back into its parts.
    pub fn parse(value: &str) -> Option<Self> {
        let (namespace, remote_id) = value.split_once("://")?;
        if namespace.is_empty() || remote_id.is_empty() {
            return None;
        }
        Some(Self::new(namespace, remote_id))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn remote_id(&self) -> &str {
        &self.remote_id
    }
}

impl fmt::Display for ExternalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.namespace, self.remote_id)
    }
}

/// Pack disc and track numbers the way the host stores them.
pub fn encode_track_number(disc: u32, track: u32) -> i64 {
    ((disc as i64) << 16) | (track as i64 & 0xffff)
}

/// Inverse of [`encode_track_number`]: `(disc, track)`.
pub fn decode_track_number(value: i64) -> (u32, u32) {
    ((value >> 16) as u32, (value & 0xffff) as u32)
}

// =============================================================================
// Stored rows
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LocalArtist {
    pub id: ArtistKey,
    pub name: String,
    pub sort_name: Option<String>,
    /// Genres joined with " / "
    pub genres: Option<String>,
    pub external_id: Option<String>,
    pub owner: Option<String>,
    pub date_added: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LocalAlbum {
    pub id: AlbumKey,
    pub title: String,
    pub artist_display: String,
    pub year: Option<i32>,
    pub genres: Option<String>,
    pub release_type: String,
    pub external_id: Option<String>,
    pub owner: Option<String>,
    pub date_added: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LocalSong {
    pub id: SongKey,
    pub album_id: AlbumKey,
    pub path_id: PathKey,
    pub title: String,
    pub artist_display: String,
    /// Packed `(disc << 16) | track`
    pub track: i64,
    /// Seconds
    pub duration: i64,
    pub year: Option<i32>,
    pub genres: Option<String>,
    pub file_name: String,
    pub bit_rate: Option<i64>,
    pub sample_rate: Option<i64>,
    pub channels: i64,
    pub external_id: Option<String>,
    pub owner: Option<String>,
    pub date_added: i64,
}

impl LocalSong {
    pub fn disc_and_track(&self) -> (u32, u32) {
        decode_track_number(self.track)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LocalPath {
    pub id: PathKey,
    pub path: String,
    pub hash: Option<String>,
    pub owner: Option<String>,
}

// =============================================================================
// Inserts
// =============================================================================

/// Values for a new `artists` row.
#[derive(Debug, Clone)]
pub struct NewArtist {
    pub external_key: ExternalKey,
    pub name: String,
    pub sort_name: Option<String>,
    pub genres: Option<String>,
    pub date_added: i64,
}

impl NewArtist {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Artist name cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Values for a new `albums` row.
#[derive(Debug, Clone)]
pub struct NewAlbum {
    pub external_key: ExternalKey,
    pub title: String,
    pub artist_display: String,
    pub year: Option<i32>,
    pub genres: Option<String>,
    pub date_added: i64,
}

impl NewAlbum {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Album title cannot be empty".to_string());
        }

        if let Some(year) = self.year {
            if !(0..=9999).contains(&year) {
                return Err(format!("Album year {} is out of valid range", year));
            }
        }

        Ok(())
    }
}

/// Values for a new `songs` row.
#[derive(Debug, Clone)]
pub struct NewSong {
    pub external_key: ExternalKey,
    pub album_id: AlbumKey,
    pub path_id: PathKey,
    pub title: String,
    pub artist_display: String,
    pub track: i64,
    pub duration: i64,
    pub year: Option<i32>,
    pub genres: Option<String>,
    pub file_name: String,
    pub bit_rate: Option<i64>,
    pub sample_rate: Option<i64>,
    pub channels: i64,
    pub date_added: i64,
}

impl NewSong {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Song title cannot be empty".to_string());
        }

        if self.file_name.is_empty() {
            return Err("Song file name cannot be empty".to_string());
        }

        if self.duration < 0 {
            return Err("Song duration cannot be negative".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumArtistLink {
    pub artist_id: ArtistKey,
    pub album_id: AlbumKey,
    pub position: i64,
    pub artist_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongArtistLink {
    pub artist_id: ArtistKey,
    pub song_id: SongKey,
    pub role_id: i64,
    pub position: i64,
    pub artist_name: String,
}
