//! Integration tests for clearing synced content
//!
//! Clearing must remove every row the engine owns and nothing else.

mod common;

use common::{scenario_a, Harness};
use core_library::repositories::{
    AlbumRepository, ArtistRepository, SongRepository, SqliteAlbumRepository,
    SqliteArtistRepository, SqliteSongRepository,
};
use core_runtime::events::{CoreEvent, LibraryEvent};
use core_sync::{NoopProgressSink, SyncError, SyncLockManager};
use tokio_util::sync::CancellationToken;

/// Host-native rows, deliberately reusing names the engine also writes.
async fn seed_host_rows(pool: &sqlx::SqlitePool) {
    for sql in [
        "INSERT INTO paths (id, path, hash, owner) VALUES (900, '/music/local/', NULL, NULL)",
        "INSERT INTO artists (id, name, external_id, owner, date_added) VALUES (900, 'Artist A', NULL, NULL, 0)",
        "INSERT INTO albums (id, title, artist_display, external_id, owner, date_added) VALUES (900, 'First Light', 'Artist A', NULL, NULL, 0)",
        "INSERT INTO album_artists (artist_id, album_id, position, artist_name, owner) VALUES (900, 900, 0, 'Artist A', NULL)",
        "INSERT INTO songs (id, album_id, path_id, title, artist_display, file_name, external_id, owner, date_added) VALUES (900, 900, 900, 'Opening', 'Artist A', 'opening.flac', NULL, NULL, 0)",
        "INSERT INTO song_artists (artist_id, song_id, role_id, position, artist_name, owner) VALUES (900, 900, 1, 0, 'Artist A', NULL)",
    ] {
        sqlx::query(sql).execute(pool).await.unwrap();
    }
}

#[tokio::test]
async fn test_scenario_b_clear_removes_owned_rows() {
    let h = Harness::new(scenario_a()).await;
    let orchestrator = h.orchestrator();
    orchestrator
        .full_sync(&NoopProgressSink, CancellationToken::new())
        .await
        .unwrap();
    assert!(orchestrator.state().last_sync().await.unwrap().is_some());

    let mut rx = h.event_bus.subscribe();
    let report = h.clearer().clear().await.unwrap();

    assert_eq!(report.counts.artists, 2);
    assert_eq!(report.counts.albums, 1);
    assert_eq!(report.counts.songs, 2);
    assert_eq!(report.counts.song_artists, 2);
    assert_eq!(report.counts.album_artists, 1);
    assert_eq!(report.counts.paths, 1);
    assert!(!report.content_root_removed);

    assert!(h.stats().await.is_empty());
    assert_eq!(orchestrator.state().last_sync().await.unwrap(), None);
    assert_eq!(*h.host.cleans.lock().unwrap(), 1);

    let cleared = rx.try_recv().unwrap();
    assert!(matches!(
        cleared,
        CoreEvent::Library(LibraryEvent::Cleared { rows_removed: 9, .. })
    ));
}

#[tokio::test]
async fn test_clear_leaves_host_rows_alone() {
    let h = Harness::new(scenario_a()).await;
    seed_host_rows(&h.pool).await;

    h.orchestrator()
        .full_sync(&NoopProgressSink, CancellationToken::new())
        .await
        .unwrap();
    h.clearer().clear().await.unwrap();

    let artists = SqliteArtistRepository::new(h.pool.clone());
    let albums = SqliteAlbumRepository::new(h.pool.clone());
    let songs = SqliteSongRepository::new(h.pool.clone());
    assert_eq!(artists.count().await.unwrap(), 1);
    assert_eq!(albums.count().await.unwrap(), 1);
    assert_eq!(songs.count().await.unwrap(), 1);

    let survivor = artists.find_by_name("Artist A").await.unwrap();
    assert_eq!(survivor.len(), 1);
    assert_eq!(survivor[0].owner, None);

    let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM song_artists")
        .fetch_one(&h.pool)
        .await
        .unwrap();
    assert_eq!(links, 1);
}

#[tokio::test]
async fn test_clear_then_resync_restores_everything() {
    let h = Harness::new(scenario_a()).await;
    let orchestrator = h.orchestrator();

    orchestrator
        .full_sync(&NoopProgressSink, CancellationToken::new())
        .await
        .unwrap();
    let before = h.stats().await;

    h.clearer().clear().await.unwrap();
    let report = orchestrator
        .full_sync(&NoopProgressSink, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.stats.songs_added, 2);
    assert_eq!(h.stats().await, before);
}

#[tokio::test]
async fn test_clear_respects_held_lease() {
    let h = Harness::new(scenario_a()).await;
    h.orchestrator()
        .full_sync(&NoopProgressSink, CancellationToken::new())
        .await
        .unwrap();

    let holder = SyncLockManager::new(h.config.lock_path.clone(), h.config.lock_ttl)
        .with_clock(h.clock.clone());
    let _lease = holder.try_acquire("full_sync").await.unwrap().unwrap();

    let err = h.clearer().clear().await.unwrap_err();
    assert!(matches!(err, SyncError::LockContention(_)));
    assert_eq!(h.stats().await.songs, 2);
}
