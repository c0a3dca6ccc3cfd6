//! # Sync Orchestrator
//!
//! Drives full and incremental walks of the remote catalog into the host
//! library.
//!
//! ## Workflow
//!
//! ### Full Sync
//! 1. Take the sync lease (contention fails immediately)
//! 2. List every remote artist
//! 3. Per artist: upsert, fetch its albums; per album: upsert, fetch its
//!    songs; per song: upsert
//! 4. Materialize each entity alongside its upsert
//! 5. Record the last-sync time and ask the host to rescan
//!
//! ### Incremental Sync
//! 1. Take the sync lease
//! 2. Page through the newest albums, up to the configured window
//! 3. Walk only albums that are not in the library yet
//! 4. Ask the host to rescan when anything was added
//!
//! The incremental window is an approximation, not a change log: edits and
//! removals are never seen, and albums added beyond the newest `window` are
//! picked up only by a later sync.
//!
//! ## Failure policy
//!
//! - Malformed or missing records are logged, counted as warnings and skipped.
//! - Store errors abort the walk or skip the record per
//!   [`StoreErrorPolicy`].
//! - Connectivity failures (including request timeouts) abort the walk.
//! - Cancellation is sampled between artists (full) or albums (incremental).
//!
//! The lease is released on every exit path.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{NoopProgressSink, SyncOrchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! let orchestrator = SyncOrchestrator::new(config, deps);
//! let report = orchestrator
//!     .full_sync(&NoopProgressSink, CancellationToken::new())
//!     .await?;
//! println!("{} songs added", report.stats.songs_added);
//! ```

use bridge_traits::{
    catalog::{AlbumListType, RemoteAlbum, RemoteArtist, RemoteCatalogClient},
    error::Result as BridgeResult,
    host::HostLibrary,
    storage::SettingsStore,
    time::Clock,
};
use core_library::AlbumKey;
use core_runtime::{
    config::{StoreErrorPolicy, SyncEngineConfig},
    events::{CoreEvent, EventBus, LibraryEvent, SyncEvent},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    error::{Result, SyncError},
    job::{SyncJob, SyncJobId, SyncPhase, SyncType},
    lock::SyncLockManager,
    materializer::{ResourceMaterializer, UNKNOWN_ARTIST},
    progress::{ProgressSink, SyncProgress},
    state::SyncStateStore,
    upsert::{StoredAlbum, StoredArtist, UpsertEngine, Upserted},
};

/// Collaborators the orchestrator works against.
#[derive(Clone)]
pub struct SyncDependencies {
    pub pool: SqlitePool,
    pub client: Arc<dyn RemoteCatalogClient>,
    pub materializer: Arc<dyn ResourceMaterializer>,
    pub settings: Arc<dyn SettingsStore>,
    pub host: Arc<dyn HostLibrary>,
    pub event_bus: EventBus,
    pub clock: Arc<dyn Clock>,
}

/// How a walk ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    Completed,
    /// Stopped at a cancellation checkpoint; committed records stay.
    Cancelled,
}

/// Counters accumulated during one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub artists_added: u64,
    pub albums_added: u64,
    pub songs_added: u64,
    /// Entities that already had a local row
    pub existing_skipped: u64,
    pub files_written: u64,
    /// Records skipped because of malformed data or a skipped store error
    pub warnings: u64,
    /// Entities stored without their materialized files
    pub materialization_failures: u64,
}

impl SyncStats {
    pub fn records_added(&self) -> u64 {
        self.artists_added + self.albums_added + self.songs_added
    }

    fn tally<R>(&mut self, upserted: &Upserted<R>, level: Level) {
        if !upserted.created {
            self.existing_skipped += 1;
            return;
        }
        match level {
            Level::Artist => self.artists_added += 1,
            Level::Album => self.albums_added += 1,
            Level::Song => self.songs_added += 1,
        }
    }
}

/// Result of a walk that did not fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub job_id: SyncJobId,
    pub sync_type: SyncType,
    pub outcome: SyncOutcome,
    pub stats: SyncStats,
    pub duration: Duration,
}

impl SyncReport {
    pub fn is_cancelled(&self) -> bool {
        self.outcome == SyncOutcome::Cancelled
    }
}

#[derive(Debug, Clone, Copy)]
enum Level {
    Artist,
    Album,
    Song,
}

enum WalkEnd {
    Completed,
    Cancelled,
}

/// Runs sync walks for one source namespace.
pub struct SyncOrchestrator {
    config: Arc<SyncEngineConfig>,
    deps: SyncDependencies,
    upserts: UpsertEngine,
    locks: SyncLockManager,
    state: SyncStateStore,
}

impl SyncOrchestrator {
    pub fn new(config: Arc<SyncEngineConfig>, deps: SyncDependencies) -> Self {
        let upserts = UpsertEngine::new(
            deps.pool.clone(),
            config.source_namespace.clone(),
            deps.clock.clone(),
        );
        let locks = SyncLockManager::new(config.lock_path.clone(), config.lock_ttl)
            .with_clock(deps.clock.clone());
        let state = SyncStateStore::new(deps.settings.clone(), &config.source_namespace);

        Self {
            config,
            deps,
            upserts,
            locks,
            state,
        }
    }

    pub fn lock_manager(&self) -> &SyncLockManager {
        &self.locks
    }

    pub fn state(&self) -> &SyncStateStore {
        &self.state
    }

    /// Walk every artist, album and song in the remote catalog.
    #[instrument(skip(self, progress, cancel), fields(namespace = %self.config.source_namespace))]
    pub async fn full_sync(
        &self,
        progress: &dyn ProgressSink,
        cancel: CancellationToken,
    ) -> Result<SyncReport> {
        self.run(SyncType::Full, progress, cancel).await
    }

    /// Walk the newest-albums window, adding albums not yet in the library.
    #[instrument(skip(self, progress, cancel), fields(namespace = %self.config.source_namespace))]
    pub async fn incremental_sync(
        &self,
        progress: &dyn ProgressSink,
        cancel: CancellationToken,
    ) -> Result<SyncReport> {
        self.run(SyncType::Incremental, progress, cancel).await
    }

    async fn run(
        &self,
        sync_type: SyncType,
        progress: &dyn ProgressSink,
        cancel: CancellationToken,
    ) -> Result<SyncReport> {
        let started = Instant::now();
        let operation = match sync_type {
            SyncType::Full => "full_sync",
            SyncType::Incremental => "incremental_sync",
        };

        let mut job = SyncJob::new(sync_type);
        job.transition(SyncPhase::Locking)?;

        let Some(lease) = self.locks.try_acquire(operation).await? else {
            job.abort("sync already in progress")?;
            warn!(operation, lock = %self.locks.path().display(), "Sync lease is held elsewhere");
            self.emit(SyncEvent::LockContended {
                operation: operation.to_string(),
            });
            return Err(SyncError::LockContention(
                self.locks.path().display().to_string(),
            ));
        };

        info!(job_id = %job.id, sync_type = %sync_type.as_str(), "Starting sync");
        self.emit(SyncEvent::Started {
            job_id: job.id.to_string(),
            namespace: self.config.source_namespace.clone(),
            is_full_sync: sync_type == SyncType::Full,
        });
        job.transition(SyncPhase::Walking)?;

        let mut stats = SyncStats::default();
        let walk = match sync_type {
            SyncType::Full => self.walk_full(&mut job, &mut stats, progress, &cancel).await,
            SyncType::Incremental => {
                self.walk_incremental(&mut job, &mut stats, progress, &cancel)
                    .await
            }
        };

        let result = self.finish(&mut job, stats, walk, started).await;

        if let Err(e) = lease.release().await {
            warn!(error = %e, "Failed to release sync lease");
        }

        result
    }

    // ------------------------------------------------------------------------
    // Walks
    // ------------------------------------------------------------------------

    async fn walk_full(
        &self,
        job: &mut SyncJob,
        stats: &mut SyncStats,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<WalkEnd> {
        let artists = self
            .fetch("artist", "*", self.deps.client.list_artists())
            .await?;
        let total = artists.len() as u64;
        info!(artists = total, "Fetched artist index");

        for (index, artist) in artists.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(processed = index, "Full sync cancelled");
                return Ok(WalkEnd::Cancelled);
            }

            self.sync_artist(artist, stats).await?;
            self.advance(job, progress, index as u64 + 1, total, &artist.name);
        }

        Ok(WalkEnd::Completed)
    }

    async fn walk_incremental(
        &self,
        job: &mut SyncJob,
        stats: &mut SyncStats,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<WalkEnd> {
        let albums = self.newest_albums().await?;
        let total = albums.len() as u64;
        info!(albums = total, window = self.config.incremental_window, "Fetched newest albums");

        for (index, album) in albums.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(processed = index, "Incremental sync cancelled");
                return Ok(WalkEnd::Cancelled);
            }

            self.sync_new_album(album, stats).await?;
            self.advance(job, progress, index as u64 + 1, total, &album.name);
        }

        Ok(WalkEnd::Completed)
    }

    /// At most `incremental_window` albums, newest first.
    async fn newest_albums(&self) -> Result<Vec<RemoteAlbum>> {
        let window = self.config.incremental_window as usize;
        let page_size = self.config.album_page_size.max(1) as usize;
        let mut albums = Vec::with_capacity(window);

        while albums.len() < window {
            let size = page_size.min(window - albums.len());
            let offset = albums.len();
            let batch = self
                .fetch(
                    "album",
                    "newest",
                    self.deps
                        .client
                        .list_albums(AlbumListType::Newest, size as u32, offset as u32),
                )
                .await?;

            let exhausted = batch.len() < size;
            albums.extend(batch);
            if exhausted {
                break;
            }
        }

        albums.truncate(window);
        Ok(albums)
    }

    async fn sync_artist(&self, artist: &RemoteArtist, stats: &mut SyncStats) -> Result<()> {
        let Some(upserted) = self.absorb(stats, self.upserts.upsert_artist(artist).await)? else {
            return Ok(());
        };
        stats.tally(&upserted, Level::Artist);
        let stored = upserted.row;
        self.note_files(
            stats,
            "artist",
            &artist.id,
            self.deps.materializer.materialize_artist(&stored.name, artist).await,
        );

        let fetched = self
            .fetch("artist", &artist.id, self.deps.client.get_artist(&artist.id))
            .await;
        let Some(detail) = self.absorb(stats, fetched)? else {
            return Ok(());
        };

        for album in &detail.albums {
            self.sync_album(album, &stored, stats).await?;
        }
        Ok(())
    }

    /// Incremental entry point: skip known albums, upsert the album's artist
    /// first otherwise.
    async fn sync_new_album(&self, album: &RemoteAlbum, stats: &mut SyncStats) -> Result<()> {
        match self.absorb(stats, self.upserts.album_exists(&album.id).await)? {
            Some(true) => {
                stats.existing_skipped += 1;
                return Ok(());
            }
            Some(false) => {}
            None => return Ok(()),
        }

        let Some(artist) = self.absorb(stats, artist_of(album))? else {
            return Ok(());
        };
        let Some(upserted) = self.absorb(stats, self.upserts.upsert_artist(&artist).await)? else {
            return Ok(());
        };
        stats.tally(&upserted, Level::Artist);
        let stored = upserted.row;
        self.note_files(
            stats,
            "artist",
            &artist.id,
            self.deps.materializer.materialize_artist(&stored.name, &artist).await,
        );

        self.sync_album(album, &stored, stats).await
    }

    /// Folder names come from the stored artist and album rows, so both walks
    /// and later metadata changes resolve to the same directories.
    async fn sync_album(
        &self,
        album: &RemoteAlbum,
        artist: &StoredArtist,
        stats: &mut SyncStats,
    ) -> Result<()> {
        let upserted = self.upserts.upsert_album(album, artist.key, &artist.name).await;
        let Some(upserted) = self.absorb(stats, upserted)? else {
            return Ok(());
        };
        stats.tally(&upserted, Level::Album);
        let stored = as_stored(album, &upserted.row);
        self.note_files(
            stats,
            "album",
            &album.id,
            self.deps.materializer.materialize_album(&artist.name, &stored).await,
        );

        let fetched = self
            .fetch("album", &album.id, self.deps.client.get_album(&album.id))
            .await;
        let Some(detail) = self.absorb(stats, fetched)? else {
            return Ok(());
        };

        self.sync_songs(&stored, &detail.songs, upserted.row.key, &artist.name, stats)
            .await
    }

    async fn sync_songs(
        &self,
        album: &RemoteAlbum,
        songs: &[bridge_traits::catalog::RemoteSong],
        album_key: AlbumKey,
        artist_name: &str,
        stats: &mut SyncStats,
    ) -> Result<()> {
        let multi_disc = songs.iter().any(|s| s.disc_number.unwrap_or(1) > 1);

        for song in songs {
            let location = self
                .deps
                .materializer
                .locate_song(artist_name, album, song, multi_disc);
            let upserted = self.upserts.upsert_song(song, album_key, &location).await;
            let Some(upserted) = self.absorb(stats, upserted)? else {
                continue;
            };
            stats.tally(&upserted, Level::Song);

            let written = self
                .deps
                .materializer
                .materialize_song(artist_name, album, song, &upserted.row.location)
                .await;
            self.note_files(stats, "song", &song.id, written);
        }

        debug!(album_id = %album.id, songs = songs.len(), "Album walked");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Outcome
    // ------------------------------------------------------------------------

    async fn finish(
        &self,
        job: &mut SyncJob,
        stats: SyncStats,
        walk: Result<WalkEnd>,
        started: Instant,
    ) -> Result<SyncReport> {
        let (job_id, sync_type) = (job.id, job.sync_type);
        let report = |outcome| SyncReport {
            job_id,
            sync_type,
            outcome,
            stats,
            duration: started.elapsed(),
        };

        match walk {
            Ok(WalkEnd::Completed) => {
                job.transition(SyncPhase::Committing)?;
                if let Err(e) = self.commit(sync_type, &stats).await {
                    error!(job_id = %job.id, error = %e, "Failed to record sync outcome");
                    job.fail(e.to_string())?;
                    self.emit_failed(job, &e);
                    return Err(e);
                }
                job.transition(SyncPhase::Done)?;

                let report = report(SyncOutcome::Completed);
                info!(
                    job_id = %job.id,
                    artists_added = stats.artists_added,
                    albums_added = stats.albums_added,
                    songs_added = stats.songs_added,
                    warnings = stats.warnings,
                    "Sync completed"
                );
                self.emit(SyncEvent::Completed {
                    job_id: job.id.to_string(),
                    artists_added: stats.artists_added,
                    albums_added: stats.albums_added,
                    songs_added: stats.songs_added,
                    warnings: stats.warnings,
                    duration_secs: report.duration.as_secs(),
                });
                Ok(report)
            }
            Ok(WalkEnd::Cancelled) => {
                job.abort("cancelled")?;
                self.emit(SyncEvent::Cancelled {
                    job_id: job.id.to_string(),
                    items_processed: job.items_processed,
                });
                Ok(report(SyncOutcome::Cancelled))
            }
            Err(e) => {
                if e.is_connectivity() {
                    warn!(job_id = %job.id, error = %e, "Sync aborted");
                    job.abort(e.to_string())?;
                } else {
                    error!(job_id = %job.id, error = %e, "Sync failed");
                    job.fail(e.to_string())?;
                }
                self.emit_failed(job, &e);
                Err(e)
            }
        }
    }

    /// Persist the completion time (full sync only) and ask the host to
    /// rescan when anything new was written.
    async fn commit(&self, sync_type: SyncType, stats: &SyncStats) -> Result<()> {
        if sync_type == SyncType::Full {
            self.state.record(self.deps.clock.now()).await?;
        }

        if stats.records_added() == 0 {
            debug!("Nothing new; skipping host rescan");
            return Ok(());
        }

        let scope = self.deps.materializer.scope();
        match self.deps.host.request_rescan(&scope).await {
            Ok(()) => {
                self.deps
                    .event_bus
                    .emit(CoreEvent::Library(LibraryEvent::RescanRequested { scope }))
                    .ok();
            }
            Err(e) => warn!(scope = %scope, error = %e, "Host rescan request failed"),
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Await a catalog call under the request timeout.
    async fn fetch<T, F>(&self, entity: &'static str, id: &str, call: F) -> Result<T>
    where
        F: Future<Output = BridgeResult<T>>,
    {
        match tokio::time::timeout(self.config.request_timeout, call).await {
            Ok(result) => result.map_err(|e| SyncError::from_bridge(e, entity, id)),
            Err(_) => Err(SyncError::Connectivity(format!(
                "{} {} timed out after {:?}",
                entity, id, self.config.request_timeout
            ))),
        }
    }

    /// Apply the per-record failure policy: `Ok(None)` means skip and go on.
    fn absorb<T>(&self, stats: &mut SyncStats, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_record_level() => {
                warn!(error = %e, "Skipping record");
                stats.warnings += 1;
                Ok(None)
            }
            Err(e)
                if e.is_store_integrity()
                    && self.config.store_error_policy == StoreErrorPolicy::SkipRecord =>
            {
                warn!(error = %e, "Skipping record after store error");
                stats.warnings += 1;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// The row stays even when its files could not be written.
    fn note_files(&self, stats: &mut SyncStats, entity: &str, id: &str, result: Result<u64>) {
        match result {
            Ok(written) => stats.files_written += written,
            Err(e) => {
                warn!(entity, id, error = %e, "Stored without materialized files");
                stats.materialization_failures += 1;
            }
        }
    }

    fn advance(
        &self,
        job: &mut SyncJob,
        progress: &dyn ProgressSink,
        processed: u64,
        total: u64,
        label: &str,
    ) {
        job.record_progress(processed, Some(total));
        let update = SyncProgress::new(processed, total, label);
        progress.report(&update);
        self.emit(SyncEvent::Progress {
            job_id: job.id.to_string(),
            items_processed: processed,
            total_items: Some(total),
            percent: update.percent(),
            phase: job.phase.as_str().to_string(),
        });
    }

    fn emit(&self, event: SyncEvent) {
        self.deps.event_bus.emit(CoreEvent::Sync(event)).ok();
    }

    fn emit_failed(&self, job: &SyncJob, err: &SyncError) {
        self.emit(SyncEvent::Failed {
            job_id: job.id.to_string(),
            message: err.to_string(),
            items_processed: job.items_processed,
            recoverable: err.is_connectivity(),
        });
    }
}

/// Minimal artist record derived from an album listing.
fn artist_of(album: &RemoteAlbum) -> Result<RemoteArtist> {
    let id = album
        .artist_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| SyncError::MalformedRecord {
            entity: "album",
            id: album.id.clone(),
            reason: "missing artist id".to_string(),
        })?;

    Ok(RemoteArtist {
        id: id.to_string(),
        name: display_name(album.artist.as_deref().unwrap_or_default()),
        sort_name: None,
        genres: Vec::new(),
        cover_art: None,
        album_count: None,
    })
}

/// `album` with the title and year its local row was created with.
fn as_stored(album: &RemoteAlbum, stored: &StoredAlbum) -> RemoteAlbum {
    RemoteAlbum {
        name: stored.title.clone(),
        year: stored.year,
        ..album.clone()
    }
}

fn display_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        UNKNOWN_ARTIST.to_string()
    } else {
        name.to_string()
    }
}
