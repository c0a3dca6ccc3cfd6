//! # Resource Materialization
//!
//! Strategies for exposing synced entries to the host beyond their database
//! rows.
//!
//! - [`NullMaterializer`] writes nothing. Songs point at playback URIs.
//! - [`FilesystemMaterializer`] mirrors the catalog under a content root:
//!
//! ```text
//! <root>/<Artist>/artist.nfo
//! <root>/<Artist>/folder.jpg
//! <root>/<Artist>/[<Year> - ]<Album>/album.nfo
//! <root>/<Artist>/[<Year> - ]<Album>/folder.jpg
//! <root>/<Artist>/[<Year> - ]<Album>/<NN> - <Title>.strm
//! <root>/<Artist>/[<Year> - ]<Album>/<NN> - <Title>.nfo
//! ```
//!
//! Every write is skip-if-exists, so re-materializing an unchanged catalog
//! writes no files. Names come from the stored rows, so a renamed or
//! renumbered remote entity maps back onto the files it already has. The content root belongs to the engine alone; `purge`
//! removes it wholesale.

use async_trait::async_trait;
use bridge_traits::{
    catalog::{RemoteAlbum, RemoteArtist, RemoteCatalogClient, RemoteSong},
    http::{HttpClient, HttpRequest},
    storage::FileSystemAccess,
};
use bytes::Bytes;
use core_runtime::config::{FilesystemOptions, MaterializationMode, SyncEngineConfig};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Where the host should find a song: the `paths` entry plus the song's
/// `file_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongLocation {
    pub directory: String,
    pub file_name: String,
}

/// Pluggable mirror of the catalog alongside the store.
#[async_trait]
pub trait ResourceMaterializer: Send + Sync {
    /// Root handed to the host when requesting a rescan.
    fn scope(&self) -> String;

    /// Location recorded on the song row.
    fn locate_song(
        &self,
        artist_name: &str,
        album: &RemoteAlbum,
        song: &RemoteSong,
        multi_disc: bool,
    ) -> SongLocation;

    /// Files for one artist, filed under the stored `artist_name`. Returns the
    /// number of files written.
    async fn materialize_artist(&self, artist_name: &str, artist: &RemoteArtist) -> Result<u64>;

    /// Files for one album. `album` carries the stored title and year.
    /// Returns the number of files written.
    async fn materialize_album(&self, artist_name: &str, album: &RemoteAlbum) -> Result<u64>;

    /// Files for one song, written only at the `location` recorded on its
    /// row. Returns the number of files written.
    async fn materialize_song(
        &self,
        artist_name: &str,
        album: &RemoteAlbum,
        song: &RemoteSong,
        location: &SongLocation,
    ) -> Result<u64>;

    /// Remove everything this materializer ever wrote. Returns whether
    /// anything was removed.
    async fn purge(&self) -> Result<bool>;
}

/// Pick the materializer the configuration asks for.
pub fn materializer_for(
    config: &SyncEngineConfig,
    client: Arc<dyn RemoteCatalogClient>,
    fs: Arc<dyn FileSystemAccess>,
    http: Option<Arc<dyn HttpClient>>,
) -> Arc<dyn ResourceMaterializer> {
    match &config.materialization {
        MaterializationMode::Database => Arc::new(NullMaterializer::new(&config.playback_base)),
        MaterializationMode::Filesystem(options) => {
            let mut materializer = FilesystemMaterializer::new(options.clone(), fs, client);
            if let Some(http) = http {
                materializer = materializer.with_artwork_client(http);
            }
            Arc::new(materializer)
        }
    }
}

// ============================================================================
// Null
// ============================================================================

/// Writes nothing; songs resolve through the playback plugin.
#[derive(Debug, Clone)]
pub struct NullMaterializer {
    playback_base: String,
}

impl NullMaterializer {
    pub fn new(playback_base: impl Into<String>) -> Self {
        Self {
            playback_base: playback_base.into(),
        }
    }
}

#[async_trait]
impl ResourceMaterializer for NullMaterializer {
    fn scope(&self) -> String {
        self.playback_base.clone()
    }

    fn locate_song(
        &self,
        _artist_name: &str,
        _album: &RemoteAlbum,
        song: &RemoteSong,
        _multi_disc: bool,
    ) -> SongLocation {
        SongLocation {
            directory: self.playback_base.clone(),
            file_name: format!("{}?action=play_track&id={}", self.playback_base, song.id),
        }
    }

    async fn materialize_artist(&self, _artist_name: &str, _artist: &RemoteArtist) -> Result<u64> {
        Ok(0)
    }

    async fn materialize_album(&self, _artist_name: &str, _album: &RemoteAlbum) -> Result<u64> {
        Ok(0)
    }

    async fn materialize_song(
        &self,
        _artist_name: &str,
        _album: &RemoteAlbum,
        _song: &RemoteSong,
        _location: &SongLocation,
    ) -> Result<u64> {
        Ok(0)
    }

    async fn purge(&self) -> Result<bool> {
        Ok(false)
    }
}

// ============================================================================
// Filesystem
// ============================================================================

/// Mirrors the catalog as stream-pointer files and `.nfo` sidecars.
pub struct FilesystemMaterializer {
    options: FilesystemOptions,
    fs: Arc<dyn FileSystemAccess>,
    client: Arc<dyn RemoteCatalogClient>,
    artwork: Option<Arc<dyn HttpClient>>,
}

impl FilesystemMaterializer {
    pub fn new(
        options: FilesystemOptions,
        fs: Arc<dyn FileSystemAccess>,
        client: Arc<dyn RemoteCatalogClient>,
    ) -> Self {
        Self {
            options,
            fs,
            client,
            artwork: None,
        }
    }

    /// Enables `folder.jpg` downloads when the options ask for them.
    pub fn with_artwork_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.artwork = Some(http);
        self
    }

    fn name(&self, raw: &str, fallback: &str) -> String {
        sanitize_component(raw, self.options.max_name_length, fallback)
    }

    fn artist_dir(&self, artist_name: &str) -> PathBuf {
        self.options
            .content_root
            .join(self.name(artist_name, UNKNOWN_ARTIST))
    }

    fn album_dir(&self, artist_name: &str, album: &RemoteAlbum) -> PathBuf {
        let title = non_empty(&album.name).unwrap_or(UNKNOWN_ALBUM);
        let folder = match album.year {
            Some(year) if year > 0 => format!("{} - {}", year, title),
            _ => title.to_string(),
        };
        self.artist_dir(artist_name)
            .join(self.name(&folder, UNKNOWN_ALBUM))
    }

    /// `NN - Title`, or `D-NN - Title` on multi-disc albums.
    fn song_stem(&self, song: &RemoteSong, multi_disc: bool) -> String {
        let track = song.track.unwrap_or(0);
        let prefix = if multi_disc {
            format!("{}-{:02}", song.disc_number.unwrap_or(1), track)
        } else {
            format!("{:02}", track)
        };

        let reserved = prefix.chars().count() + 3 + 1 + self.options.stream_extension.len();
        let budget = self.options.max_name_length.saturating_sub(reserved).max(8);
        let title = non_empty(&song.title).unwrap_or(UNKNOWN_TITLE);

        format!("{} - {}", prefix, sanitize_component(title, budget, UNKNOWN_TITLE))
    }

    async fn write_if_absent(&self, path: &Path, data: Bytes) -> Result<bool> {
        let exists = self
            .fs
            .exists(path)
            .await
            .map_err(|e| SyncError::Materialization(format!("{}: {}", path.display(), e)))?;
        if exists {
            return Ok(false);
        }

        self.fs
            .write_file(path, data)
            .await
            .map_err(|e| SyncError::Materialization(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Materialized file");
        Ok(true)
    }

    async fn ensure_dir(&self, dir: &Path) -> Result<()> {
        self.fs
            .create_dir_all(dir)
            .await
            .map_err(|e| SyncError::Materialization(format!("{}: {}", dir.display(), e)))
    }

    /// Best effort: artwork problems are logged and never fail the entity.
    async fn fetch_cover(&self, dir: &Path, cover_art: Option<&str>) -> u64 {
        let (Some(http), Some(cover_id)) = (&self.artwork, cover_art) else {
            return 0;
        };
        if !self.options.download_artwork {
            return 0;
        }

        let target = dir.join("folder.jpg");
        match self.fs.exists(&target).await {
            Ok(false) => {}
            _ => return 0,
        }

        let url = match self
            .client
            .resolve_cover_art_url(cover_id, Some(self.options.artwork_size))
        {
            Ok(url) => url,
            Err(e) => {
                warn!(cover_id, error = %e, "Cannot resolve cover art");
                return 0;
            }
        };

        match http.execute(HttpRequest::get(url)).await {
            Ok(response) if response.is_success() && !response.body.is_empty() => {
                match self.write_if_absent(&target, response.body).await {
                    Ok(true) => 1,
                    Ok(false) => 0,
                    Err(e) => {
                        warn!(error = %e, "Failed to store cover art");
                        0
                    }
                }
            }
            Ok(response) => {
                debug!(cover_id, status = response.status, "No cover art available");
                0
            }
            Err(e) => {
                warn!(cover_id, error = %e, "Cover art download failed");
                0
            }
        }
    }
}

#[async_trait]
impl ResourceMaterializer for FilesystemMaterializer {
    fn scope(&self) -> String {
        let mut root = self.options.content_root.display().to_string();
        if !root.ends_with(MAIN_SEPARATOR) {
            root.push(MAIN_SEPARATOR);
        }
        root
    }

    fn locate_song(
        &self,
        artist_name: &str,
        album: &RemoteAlbum,
        song: &RemoteSong,
        multi_disc: bool,
    ) -> SongLocation {
        let mut directory = self.album_dir(artist_name, album).display().to_string();
        directory.push(MAIN_SEPARATOR);

        SongLocation {
            directory,
            file_name: format!(
                "{}.{}",
                self.song_stem(song, multi_disc),
                self.options.stream_extension
            ),
        }
    }

    async fn materialize_artist(&self, artist_name: &str, artist: &RemoteArtist) -> Result<u64> {
        let name = non_empty(artist_name).unwrap_or(UNKNOWN_ARTIST);
        let dir = self.artist_dir(name);
        self.ensure_dir(&dir).await?;

        let nfo = NfoWriter::new("artist")
            .field("name", Some(name))
            .field("sortname", artist.sort_name.as_deref())
            .field("genre", joined(&artist.genres).as_deref())
            .finish();

        let mut written = u64::from(self.write_if_absent(&dir.join("artist.nfo"), nfo).await?);
        written += self.fetch_cover(&dir, artist.cover_art.as_deref()).await;
        Ok(written)
    }

    async fn materialize_album(&self, artist_name: &str, album: &RemoteAlbum) -> Result<u64> {
        let dir = self.album_dir(artist_name, album);
        self.ensure_dir(&dir).await?;

        let year = album.year.filter(|y| *y > 0).map(|y| y.to_string());
        let nfo = NfoWriter::new("album")
            .field("title", Some(non_empty(&album.name).unwrap_or(UNKNOWN_ALBUM)))
            .field("artist", Some(album.artist.as_deref().unwrap_or(artist_name)))
            .field("year", year.as_deref())
            .field("genre", album.genre.as_deref())
            .finish();

        let mut written = u64::from(self.write_if_absent(&dir.join("album.nfo"), nfo).await?);
        written += self.fetch_cover(&dir, album.cover_art.as_deref()).await;
        Ok(written)
    }

    async fn materialize_song(
        &self,
        artist_name: &str,
        album: &RemoteAlbum,
        song: &RemoteSong,
        location: &SongLocation,
    ) -> Result<u64> {
        let dir = Path::new(&location.directory);
        if !dir.starts_with(&self.options.content_root) {
            // Recorded while songs pointed at playback URIs.
            debug!(
                song_id = %song.id,
                directory = %location.directory,
                "Song lives outside the content root"
            );
            return Ok(0);
        }
        let pointer = dir.join(&location.file_name);
        let stem = pointer
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| location.file_name.clone());

        let mut written = 0;
        let pointer_exists = self
            .fs
            .exists(&pointer)
            .await
            .map_err(|e| SyncError::Materialization(format!("{}: {}", pointer.display(), e)))?;
        if !pointer_exists {
            let url = self.client.resolve_stream_url(&song.id).map_err(|e| {
                SyncError::Materialization(format!("stream URL for {}: {}", song.id, e))
            })?;
            written += u64::from(self.write_if_absent(&pointer, Bytes::from(url)).await?);
        }

        let track = song.track.map(|t| t.to_string());
        let disc = song.disc_number.map(|d| d.to_string());
        let duration = song.duration.map(|d| d.to_string());
        let year = song.year.filter(|y| *y > 0).map(|y| y.to_string());
        let nfo = NfoWriter::new("song")
            .field("title", Some(non_empty(&song.title).unwrap_or(UNKNOWN_TITLE)))
            .field("artist", Some(song.artist.as_deref().unwrap_or(artist_name)))
            .field("album", Some(non_empty(&album.name).unwrap_or(UNKNOWN_ALBUM)))
            .field("track", track.as_deref())
            .field("disc", disc.as_deref())
            .field("duration", duration.as_deref())
            .field("year", year.as_deref())
            .field("genre", song.genre.as_deref())
            .finish();
        written += u64::from(
            self.write_if_absent(&dir.join(format!("{}.nfo", stem)), nfo)
                .await?,
        );

        Ok(written)
    }

    async fn purge(&self) -> Result<bool> {
        let root = &self.options.content_root;
        let exists = self
            .fs
            .exists(root)
            .await
            .map_err(|e| SyncError::Materialization(format!("{}: {}", root.display(), e)))?;
        if !exists {
            return Ok(false);
        }

        self.fs
            .delete_dir_all(root)
            .await
            .map_err(|e| SyncError::Materialization(format!("{}: {}", root.display(), e)))?;
        info!(root = %root.display(), "Removed content root");
        Ok(true)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Make `raw` safe as one path component.
///
/// Strips `<>:"/\|?*` and control characters, trims surrounding whitespace and
/// trailing dots, caps the length at `max_len` characters and substitutes
/// `fallback` when nothing usable is left.
pub fn sanitize_component(raw: &str, max_len: usize, fallback: &str) -> String {
    const RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    let cleaned: String = raw
        .chars()
        .filter(|c| !RESERVED.contains(c) && !c.is_control())
        .collect();

    let capped: String = cleaned.trim().chars().take(max_len).collect();
    let trimmed = capped.trim_end_matches(['.', ' ']).trim();

    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn joined(values: &[String]) -> Option<String> {
    (!values.is_empty()).then(|| values.join(" / "))
}

fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

struct NfoWriter {
    root: &'static str,
    body: String,
}

impl NfoWriter {
    fn new(root: &'static str) -> Self {
        Self {
            root,
            body: String::new(),
        }
    }

    fn field(mut self, tag: &str, value: Option<&str>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.body
                .push_str(&format!("    <{tag}>{}</{tag}>\n", xml_escape(value)));
        }
        self
    }

    fn finish(self) -> Bytes {
        Bytes::from(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<{root}>\n{}</{root}>\n",
            self.body,
            root = self.root
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::TokioFileSystem;
    use bridge_traits::catalog::{AlbumDetail, AlbumListType, ArtistDetail};
    use bridge_traits::error::Result as BridgeResult;

    struct UrlOnlyClient;

    #[async_trait]
    impl RemoteCatalogClient for UrlOnlyClient {
        async fn list_artists(&self) -> BridgeResult<Vec<RemoteArtist>> {
            Ok(Vec::new())
        }
        async fn get_artist(&self, id: &str) -> BridgeResult<ArtistDetail> {
            Err(bridge_traits::BridgeError::NotFound(id.to_string()))
        }
        async fn get_album(&self, id: &str) -> BridgeResult<AlbumDetail> {
            Err(bridge_traits::BridgeError::NotFound(id.to_string()))
        }
        async fn list_albums(
            &self,
            _list_type: AlbumListType,
            _size: u32,
            _offset: u32,
        ) -> BridgeResult<Vec<RemoteAlbum>> {
            Ok(Vec::new())
        }
        fn resolve_stream_url(&self, song_id: &str) -> BridgeResult<String> {
            Ok(format!("https://music.example/rest/stream?id={}", song_id))
        }
        fn resolve_cover_art_url(&self, id: &str, _size: Option<u32>) -> BridgeResult<String> {
            Ok(format!("https://music.example/rest/getCoverArt?id={}", id))
        }
    }

    fn album(name: &str, year: Option<i32>) -> RemoteAlbum {
        RemoteAlbum {
            id: "al-1".into(),
            name: name.into(),
            artist: Some("Joni Mitchell".into()),
            artist_id: Some("ar-1".into()),
            year,
            genre: Some("Folk".into()),
            cover_art: None,
            song_count: Some(2),
        }
    }

    fn song(id: &str, title: &str, track: u32, disc: u32) -> RemoteSong {
        RemoteSong {
            id: id.into(),
            title: title.into(),
            artist: Some("Joni Mitchell".into()),
            album_id: Some("al-1".into()),
            album: Some("Blue".into()),
            track: Some(track),
            disc_number: Some(disc),
            duration: Some(180),
            year: Some(1971),
            genre: Some("Folk".into()),
            bit_rate: Some(320),
            sample_rate: Some(44100),
            suffix: Some("flac".into()),
            cover_art: None,
        }
    }

    fn filesystem(root: &Path) -> FilesystemMaterializer {
        FilesystemMaterializer::new(
            FilesystemOptions::new(root),
            Arc::new(TokioFileSystem::new()),
            Arc::new(UrlOnlyClient),
        )
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("AC/DC", 100, "x"), "ACDC");
        assert_eq!(sanitize_component("What? <Live>", 100, "x"), "What Live");
        assert_eq!(sanitize_component("Trailing...  ", 100, "x"), "Trailing");
        assert_eq!(sanitize_component("..", 100, "Unknown"), "Unknown");
        assert_eq!(sanitize_component("***", 100, "Unknown"), "Unknown");
        assert_eq!(sanitize_component("tab\there", 100, "x"), "tabhere");
        assert_eq!(sanitize_component("Björk Guðmundsdóttir", 5, "x"), "Björk");
    }

    #[test]
    fn test_null_locates_playback_uri() {
        let null = NullMaterializer::new("plugin://plugin.audio.navidrome/");
        let location = null.locate_song("Joni", &album("Blue", None), &song("s-9", "A Case of You", 9, 1), false);

        assert_eq!(location.directory, "plugin://plugin.audio.navidrome/");
        assert_eq!(
            location.file_name,
            "plugin://plugin.audio.navidrome/?action=play_track&id=s-9"
        );
        assert_eq!(null.scope(), "plugin://plugin.audio.navidrome/");
    }

    #[test]
    fn test_filesystem_locates_song() {
        let root = PathBuf::from("/srv/music/navidrome");
        let fsm = filesystem(&root);

        let location = fsm.locate_song(
            "Joni Mitchell",
            &album("Blue", Some(1971)),
            &song("s-1", "All I Want", 1, 1),
            false,
        );
        let expected_dir = root.join("Joni Mitchell").join("1971 - Blue");
        assert_eq!(
            location.directory,
            format!("{}{}", expected_dir.display(), MAIN_SEPARATOR)
        );
        assert_eq!(location.file_name, "01 - All I Want.strm");

        let location = fsm.locate_song(
            "Joni Mitchell",
            &album("Blue", Some(1971)),
            &song("s-2", "River", 5, 2),
            true,
        );
        assert_eq!(location.file_name, "2-05 - River.strm");
    }

    #[tokio::test]
    async fn test_materialize_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("navidrome");
        let fsm = filesystem(&root);

        let artist = RemoteArtist {
            id: "ar-1".into(),
            name: "Joni Mitchell".into(),
            sort_name: Some("Mitchell, Joni".into()),
            genres: vec!["Folk".into()],
            cover_art: None,
            album_count: Some(1),
        };
        let blue = album("Blue", Some(1971));
        let track = song("s-1", "Carey & Me", 3, 1);
        let location = fsm.locate_song("Joni Mitchell", &blue, &track, false);

        assert_eq!(fsm.materialize_artist("Joni Mitchell", &artist).await.unwrap(), 1);
        assert_eq!(fsm.materialize_album("Joni Mitchell", &blue).await.unwrap(), 1);
        assert_eq!(
            fsm.materialize_song("Joni Mitchell", &blue, &track, &location)
                .await
                .unwrap(),
            2
        );

        let album_dir = root.join("Joni Mitchell").join("1971 - Blue");
        let pointer = std::fs::read_to_string(album_dir.join("03 - Carey & Me.strm")).unwrap();
        assert_eq!(pointer, "https://music.example/rest/stream?id=s-1");

        let nfo = std::fs::read_to_string(album_dir.join("03 - Carey & Me.nfo")).unwrap();
        assert!(nfo.contains("<title>Carey &amp; Me</title>"));
        assert!(nfo.contains("<track>3</track>"));

        let artist_nfo = std::fs::read_to_string(root.join("Joni Mitchell/artist.nfo")).unwrap();
        assert!(artist_nfo.contains("<sortname>Mitchell, Joni</sortname>"));

        // Second pass writes nothing
        assert_eq!(fsm.materialize_artist("Joni Mitchell", &artist).await.unwrap(), 0);
        assert_eq!(fsm.materialize_album("Joni Mitchell", &blue).await.unwrap(), 0);
        assert_eq!(
            fsm.materialize_song("Joni Mitchell", &blue, &track, &location)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_song_files_follow_recorded_location() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("navidrome");
        let fsm = filesystem(&root);

        let blue = album("Blue", Some(1971));
        let river = song("s-2", "River", 5, 1);
        let recorded = fsm.locate_song("Joni Mitchell", &blue, &river, false);
        // The album has since gained a second disc.
        assert_ne!(recorded, fsm.locate_song("Joni Mitchell", &blue, &river, true));

        assert_eq!(
            fsm.materialize_song("Joni Mitchell", &blue, &river, &recorded)
                .await
                .unwrap(),
            2
        );

        let album_dir = root.join("Joni Mitchell").join("1971 - Blue");
        let mut names: Vec<String> = std::fs::read_dir(&album_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["05 - River.nfo", "05 - River.strm"]);
    }

    #[tokio::test]
    async fn test_song_outside_content_root_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let fsm = filesystem(&dir.path().join("navidrome"));
        let playback = NullMaterializer::new("plugin://plugin.audio.navidrome/");

        let blue = album("Blue", None);
        let river = song("s-2", "River", 5, 1);
        let recorded = playback.locate_song("Joni Mitchell", &blue, &river, false);

        assert_eq!(
            fsm.materialize_song("Joni Mitchell", &blue, &river, &recorded)
                .await
                .unwrap(),
            0
        );
    }

    struct CoverServer {
        requests: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl HttpClient for CoverServer {
        async fn execute(
            &self,
            request: HttpRequest,
        ) -> BridgeResult<bridge_traits::http::HttpResponse> {
            use bridge_traits::http::HttpResponse;
            self.requests
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if request.url.ends_with("id=cv-album") {
                Ok(HttpResponse::new(200, Bytes::from_static(b"\xFF\xD8jpeg")))
            } else {
                Ok(HttpResponse::new(404, Bytes::new()))
            }
        }
    }

    #[tokio::test]
    async fn test_cover_art_is_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("navidrome");
        let server = Arc::new(CoverServer {
            requests: Default::default(),
        });
        let fsm = filesystem(&root).with_artwork_client(server.clone());

        let mut blue = album("Blue", Some(1971));
        blue.cover_art = Some("cv-album".into());
        let artist = RemoteArtist {
            id: "ar-1".into(),
            name: "Joni Mitchell".into(),
            sort_name: None,
            genres: Vec::new(),
            cover_art: Some("cv-missing".into()),
            album_count: Some(1),
        };

        // artist.nfo only; the 404 is not an error
        assert_eq!(fsm.materialize_artist("Joni Mitchell", &artist).await.unwrap(), 1);
        assert!(!root.join("Joni Mitchell/folder.jpg").exists());

        // album.nfo + folder.jpg
        assert_eq!(fsm.materialize_album("Joni Mitchell", &blue).await.unwrap(), 2);
        let cover = root.join("Joni Mitchell").join("1971 - Blue").join("folder.jpg");
        assert_eq!(std::fs::read(&cover).unwrap(), b"\xFF\xD8jpeg");

        // an existing folder.jpg is not fetched again
        assert_eq!(fsm.materialize_album("Joni Mitchell", &blue).await.unwrap(), 0);
        assert_eq!(server.requests.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_purge_removes_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("navidrome");
        let fsm = filesystem(&root);

        assert!(!fsm.purge().await.unwrap());

        let blue = album("Blue", None);
        fsm.materialize_album("Joni Mitchell", &blue).await.unwrap();
        assert!(root.exists());

        assert!(fsm.purge().await.unwrap());
        assert!(!root.exists());
        assert!(dir.path().exists());
    }
}
