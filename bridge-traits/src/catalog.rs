//! Remote Catalog Abstraction
//!
//! Read-only access to a remote music catalog organised as
//! artists → albums → songs. Identifiers are opaque strings assigned by the
//! remote system; the only guarantee relied upon is that the same id always
//! denotes the same logical entity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Artist as reported by the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sort_name: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub cover_art: Option<String>,
    #[serde(default)]
    pub album_count: Option<u32>,
}

/// Album summary as reported by the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub artist_id: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub cover_art: Option<String>,
    #[serde(default)]
    pub song_count: Option<u32>,
}

/// Song summary as reported by the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSong {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album_id: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub track: Option<u32>,
    #[serde(default)]
    pub disc_number: Option<u32>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub genre: Option<String>,
    /// Bit rate in kbps
    #[serde(default)]
    pub bit_rate: Option<u32>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub cover_art: Option<String>,
}

/// An artist together with its album summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistDetail {
    pub artist: RemoteArtist,
    pub albums: Vec<RemoteAlbum>,
}

/// An album together with its songs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumDetail {
    pub album: RemoteAlbum,
    pub songs: Vec<RemoteSong>,
}

/// Sort order for paginated album listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlbumListType {
    AlphabeticalByName,
    AlphabeticalByArtist,
    Newest,
    Random,
    /// Most played
    Frequent,
    /// Recently played
    Recent,
    /// Top rated
    Highest,
}

impl AlbumListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlbumListType::AlphabeticalByName => "alphabeticalByName",
            AlbumListType::AlphabeticalByArtist => "alphabeticalByArtist",
            AlbumListType::Newest => "newest",
            AlbumListType::Random => "random",
            AlbumListType::Frequent => "frequent",
            AlbumListType::Recent => "recent",
            AlbumListType::Highest => "highest",
        }
    }
}

impl fmt::Display for AlbumListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only accessor over a remote music catalog.
///
/// Implementations own authentication, request signing, and payload parsing.
/// They must report failures through the [`BridgeError`](crate::BridgeError)
/// kinds so the sync engine can tell a skippable record problem
/// (`NotFound`, `Malformed`) from a walk-ending one (`Connectivity`).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::catalog::{AlbumListType, RemoteCatalogClient};
///
/// async fn newest(client: &dyn RemoteCatalogClient) -> Result<()> {
///     for album in client.list_albums(AlbumListType::Newest, 50, 0).await? {
///         println!("{} ({})", album.name, album.id);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait RemoteCatalogClient: Send + Sync {
    /// Every artist in the catalog, flattened across any alphabetical index.
    async fn list_artists(&self) -> Result<Vec<RemoteArtist>>;

    /// One artist and its album summaries.
    async fn get_artist(&self, id: &str) -> Result<ArtistDetail>;

    /// One album and its songs.
    async fn get_album(&self, id: &str) -> Result<AlbumDetail>;

    /// A page of album summaries in the requested order.
    async fn list_albums(
        &self,
        list_type: AlbumListType,
        size: u32,
        offset: u32,
    ) -> Result<Vec<RemoteAlbum>>;

    /// Playable URL for a song, reflecting the current transcoding settings.
    fn resolve_stream_url(&self, song_id: &str) -> Result<String>;

    /// URL of a cover-art image, optionally scaled to `size` pixels.
    fn resolve_cover_art_url(&self, cover_art_id: &str, size: Option<u32>) -> Result<String>;
}
