//! Shared fakes for the sync integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_desktop::{SqliteSettingsStore, TokioFileSystem};
use bridge_traits::{
    catalog::{
        AlbumDetail, AlbumListType, ArtistDetail, RemoteAlbum, RemoteArtist,
        RemoteCatalogClient, RemoteSong,
    },
    error::{BridgeError, Result as BridgeResult},
    host::HostLibrary,
    time::ManualClock,
};
use chrono::{TimeZone, Utc};
use core_library::{create_test_pool, LibraryStats};
use core_runtime::{
    config::{SyncEngineConfig, SyncEngineConfigBuilder},
    events::EventBus,
};
use core_sync::{
    materializer_for, LibraryClearer, SyncDependencies, SyncOrchestrator, SyncStateStore,
};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const NS: &str = "navidrome";

// ============================================================================
// Remote catalog
// ============================================================================

#[derive(Clone, Copy)]
pub enum Failure {
    NotFound,
    Malformed,
    Connectivity,
}

impl Failure {
    fn raise(self, id: &str) -> BridgeError {
        match self {
            Failure::NotFound => BridgeError::NotFound(id.to_string()),
            Failure::Malformed => BridgeError::Malformed(format!("bad payload for {}", id)),
            Failure::Connectivity => BridgeError::Connectivity("connection refused".to_string()),
        }
    }
}

/// In-memory catalog; built up front, read-only afterwards.
#[derive(Default)]
pub struct FakeCatalog {
    artists: Vec<RemoteArtist>,
    artist_albums: HashMap<String, Vec<RemoteAlbum>>,
    album_songs: HashMap<String, Vec<RemoteSong>>,
    newest: Vec<RemoteAlbum>,
    failures: HashMap<String, Failure>,
    slow: HashSet<String>,
    delay: Duration,
    pub album_list_calls: Mutex<Vec<(u32, u32)>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artist(mut self, id: &str, name: &str) -> Self {
        self.artists.push(RemoteArtist {
            id: id.into(),
            name: name.into(),
            sort_name: None,
            genres: vec!["Rock".into()],
            cover_art: None,
            album_count: None,
        });
        self.artist_albums.entry(id.to_string()).or_default();
        self
    }

    pub fn album(mut self, artist_id: &str, id: &str, name: &str, year: i32) -> Self {
        let artist_name = self
            .artists
            .iter()
            .find(|a| a.id == artist_id)
            .map(|a| a.name.clone());
        let album = RemoteAlbum {
            id: id.into(),
            name: name.into(),
            artist: artist_name,
            artist_id: Some(artist_id.into()),
            year: Some(year),
            genre: Some("Rock".into()),
            cover_art: None,
            song_count: None,
        };
        self.artist_albums
            .entry(artist_id.to_string())
            .or_default()
            .push(album);
        self.album_songs.entry(id.to_string()).or_default();
        self
    }

    pub fn song(mut self, album_id: &str, id: &str, title: &str, disc: u32, track: u32) -> Self {
        self.album_songs
            .entry(album_id.to_string())
            .or_default()
            .push(RemoteSong {
                id: id.into(),
                title: title.into(),
                artist: None,
                album_id: Some(album_id.into()),
                album: None,
                track: Some(track),
                disc_number: Some(disc),
                duration: Some(200),
                year: None,
                genre: None,
                bit_rate: Some(320),
                sample_rate: Some(44100),
                suffix: Some("flac".into()),
                cover_art: None,
            });
        self
    }

    /// Newest-first listing served by `list_albums(Newest, ..)`.
    pub fn newest(mut self, albums: Vec<RemoteAlbum>) -> Self {
        for album in &albums {
            self.album_songs.entry(album.id.clone()).or_default();
        }
        self.newest = albums;
        self
    }

    /// Every call touching `id` fails with `failure`.
    pub fn failing(mut self, id: &str, failure: Failure) -> Self {
        self.failures.insert(id.to_string(), failure);
        self
    }

    /// `get_artist(id)` sleeps for `delay` before answering.
    pub fn slow(mut self, id: &str, delay: Duration) -> Self {
        self.slow.insert(id.to_string());
        self.delay = delay;
        self
    }

    fn check(&self, id: &str) -> BridgeResult<()> {
        match self.failures.get(id) {
            Some(failure) => Err(failure.raise(id)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteCatalogClient for FakeCatalog {
    async fn list_artists(&self) -> BridgeResult<Vec<RemoteArtist>> {
        self.check("*")?;
        Ok(self.artists.clone())
    }

    async fn get_artist(&self, id: &str) -> BridgeResult<ArtistDetail> {
        if self.slow.contains(id) {
            tokio::time::sleep(self.delay).await;
        }
        self.check(id)?;
        let artist = self
            .artists
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(id.to_string()))?;
        let albums = self.artist_albums.get(id).cloned().unwrap_or_default();
        Ok(ArtistDetail { artist, albums })
    }

    async fn get_album(&self, id: &str) -> BridgeResult<AlbumDetail> {
        self.check(id)?;
        let album = self
            .artist_albums
            .values()
            .flatten()
            .chain(self.newest.iter())
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(id.to_string()))?;
        let songs = self.album_songs.get(id).cloned().unwrap_or_default();
        Ok(AlbumDetail { album, songs })
    }

    async fn list_albums(
        &self,
        list_type: AlbumListType,
        size: u32,
        offset: u32,
    ) -> BridgeResult<Vec<RemoteAlbum>> {
        assert_eq!(list_type, AlbumListType::Newest);
        self.album_list_calls.lock().unwrap().push((size, offset));
        Ok(self
            .newest
            .iter()
            .skip(offset as usize)
            .take(size as usize)
            .cloned()
            .collect())
    }

    fn resolve_stream_url(&self, song_id: &str) -> BridgeResult<String> {
        Ok(format!("https://music.example/rest/stream?id={}", song_id))
    }

    fn resolve_cover_art_url(&self, id: &str, size: Option<u32>) -> BridgeResult<String> {
        Ok(format!(
            "https://music.example/rest/getCoverArt?id={}&size={}",
            id,
            size.unwrap_or(0)
        ))
    }
}

/// `count` albums by one artist, newest first, each with one song.
pub fn newest_albums(count: usize) -> Vec<RemoteAlbum> {
    (0..count)
        .map(|i| RemoteAlbum {
            id: format!("al-{:03}", i),
            name: format!("Album {:03}", i),
            artist: Some("Prolific".into()),
            artist_id: Some("ar-prolific".into()),
            year: Some(2024),
            genre: None,
            cover_art: None,
            song_count: Some(0),
        })
        .collect()
}

/// Scenario A: Artist A with one two-song album, Artist B with nothing.
pub fn scenario_a() -> FakeCatalog {
    FakeCatalog::new()
        .artist("ar-a", "Artist A")
        .artist("ar-b", "Artist B")
        .album("ar-a", "al-1", "First Light", 2019)
        .song("al-1", "s-1", "Opening", 1, 1)
        .song("al-1", "s-2", "Closing", 1, 2)
}

// ============================================================================
// Host
// ============================================================================

#[derive(Default)]
pub struct RecordingHost {
    pub scans: Mutex<Vec<String>>,
    pub cleans: Mutex<u32>,
}

#[async_trait]
impl HostLibrary for RecordingHost {
    async fn request_rescan(&self, scope: &str) -> BridgeResult<()> {
        self.scans.lock().unwrap().push(scope.to_string());
        Ok(())
    }

    async fn request_clean(&self) -> BridgeResult<()> {
        *self.cleans.lock().unwrap() += 1;
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub config: Arc<SyncEngineConfig>,
    pub catalog: Arc<FakeCatalog>,
    pub host: Arc<RecordingHost>,
    pub settings: Arc<SqliteSettingsStore>,
    pub clock: Arc<ManualClock>,
    pub event_bus: EventBus,
}

impl Harness {
    pub async fn new(catalog: FakeCatalog) -> Self {
        Self::with_config(catalog, |builder| builder).await
    }

    pub async fn with_config(
        catalog: FakeCatalog,
        configure: impl FnOnce(SyncEngineConfigBuilder) -> SyncEngineConfigBuilder,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let builder = SyncEngineConfig::builder()
            .source_namespace(NS)
            .database_path(dir.path().join("MyMusic.db"))
            .lock_path(dir.path().join("sync.lock"));
        let config = configure(builder).build().unwrap();

        Self {
            pool: create_test_pool().await.unwrap(),
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            host: Arc::new(RecordingHost::default()),
            settings: Arc::new(SqliteSettingsStore::in_memory().await.unwrap()),
            clock: Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            )),
            event_bus: EventBus::new(256),
            dir,
        }
    }

    pub fn deps(&self) -> SyncDependencies {
        SyncDependencies {
            pool: self.pool.clone(),
            client: self.catalog.clone(),
            materializer: materializer_for(
                &self.config,
                self.catalog.clone(),
                Arc::new(TokioFileSystem::new()),
                None,
            ),
            settings: self.settings.clone(),
            host: self.host.clone(),
            event_bus: self.event_bus.clone(),
            clock: self.clock.clone(),
        }
    }

    pub fn orchestrator(&self) -> SyncOrchestrator {
        SyncOrchestrator::new(self.config.clone(), self.deps())
    }

    pub fn clearer(&self) -> LibraryClearer {
        let deps = self.deps();
        LibraryClearer::new(
            self.pool.clone(),
            NS,
            self.orchestrator().lock_manager().clone(),
            deps.materializer,
            SyncStateStore::new(self.settings.clone(), NS),
            self.host.clone(),
            self.event_bus.clone(),
        )
    }

    pub async fn stats(&self) -> LibraryStats {
        LibraryStats::collect(&self.pool, NS).await.unwrap()
    }

    pub fn scans(&self) -> Vec<String> {
        self.host.scans.lock().unwrap().clone()
    }
}
