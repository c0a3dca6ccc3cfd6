//! Integration tests for filesystem materialization
//!
//! With a content root configured, every synced song gets a stream-pointer
//! file and `.nfo` sidecar, and the song row points at that file.

mod common;

use bridge_traits::catalog::RemoteAlbum;
use common::{scenario_a, FakeCatalog, Harness, NS};
use core_library::{
    repositories::{PathRepository, SongRepository, SqlitePathRepository, SqliteSongRepository},
    ExternalKey,
};
use core_runtime::config::{FilesystemOptions, MaterializationMode};
use core_sync::NoopProgressSink;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

async fn filesystem_harness(catalog: FakeCatalog) -> (Harness, TempDir) {
    let content = tempfile::tempdir().unwrap();
    let root = content.path().join("navidrome");
    let h = Harness::with_config(catalog, move |b| {
        b.materialization(MaterializationMode::Filesystem(
            FilesystemOptions::new(root).with_artwork(false),
        ))
    })
    .await;
    (h, content)
}

fn with_sep(path: &Path) -> String {
    format!("{}{}", path.display(), MAIN_SEPARATOR)
}

fn pointer_files(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            found.extend(pointer_files(&path));
        } else if path.extension().is_some_and(|ext| ext == "strm") {
            found.push(path);
        }
    }
    found.sort();
    found
}

async fn recorded_songs(h: &Harness) -> Vec<PathBuf> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT p.path, s.file_name FROM songs s JOIN paths p ON p.id = s.path_id WHERE s.owner = ?",
    )
    .bind(NS)
    .fetch_all(&h.pool)
    .await
    .unwrap();
    let mut recorded: Vec<PathBuf> = rows
        .into_iter()
        .map(|(dir, file)| Path::new(&dir).join(file))
        .collect();
    recorded.sort();
    recorded
}

#[tokio::test]
async fn test_full_sync_writes_tree() {
    let (h, content) = filesystem_harness(scenario_a()).await;
    let root = content.path().join("navidrome");

    let report = h
        .orchestrator()
        .full_sync(&NoopProgressSink, CancellationToken::new())
        .await
        .unwrap();

    // 2 artist.nfo + 1 album.nfo + 2 x (.strm + .nfo)
    assert_eq!(report.stats.files_written, 7);
    assert_eq!(report.stats.materialization_failures, 0);

    let album_dir = root.join("Artist A").join("2019 - First Light");
    assert!(root.join("Artist A/artist.nfo").exists());
    assert!(root.join("Artist B/artist.nfo").exists());
    assert!(album_dir.join("album.nfo").exists());
    assert!(album_dir.join("02 - Closing.nfo").exists());
    assert_eq!(
        std::fs::read_to_string(album_dir.join("01 - Opening.strm")).unwrap(),
        "https://music.example/rest/stream?id=s-1"
    );

    let song = SqliteSongRepository::new(h.pool.clone())
        .find_by_external_key(&ExternalKey::new(NS, "s-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(song.file_name, "01 - Opening.strm");

    let paths = SqlitePathRepository::new(h.pool.clone())
        .list_owned(NS)
        .await
        .unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].path, with_sep(&album_dir));
    assert_eq!(song.path_id, paths[0].id);

    assert_eq!(h.scans(), vec![with_sep(&root)]);
}

#[tokio::test]
async fn test_resync_writes_no_files() {
    let (h, _content) = filesystem_harness(scenario_a()).await;
    let orchestrator = h.orchestrator();

    orchestrator
        .full_sync(&NoopProgressSink, CancellationToken::new())
        .await
        .unwrap();
    let second = orchestrator
        .full_sync(&NoopProgressSink, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(second.stats.files_written, 0);
    assert_eq!(second.stats.records_added(), 0);
}

#[tokio::test]
async fn test_multi_disc_album_prefixes_disc() {
    let catalog = FakeCatalog::new()
        .artist("ar-1", "Band")
        .album("ar-1", "al-1", "Double", 2010)
        .song("al-1", "s-1", "Side A", 1, 1)
        .song("al-1", "s-2", "Side C", 2, 1);
    let (h, content) = filesystem_harness(catalog).await;

    h.orchestrator()
        .full_sync(&NoopProgressSink, CancellationToken::new())
        .await
        .unwrap();

    let album_dir = content.path().join("navidrome/Band/2010 - Double");
    assert!(album_dir.join("1-01 - Side A.strm").exists());
    assert!(album_dir.join("2-01 - Side C.strm").exists());
}

#[tokio::test]
async fn test_reserved_characters_are_sanitized() {
    let catalog = FakeCatalog::new()
        .artist("ar-1", "AC/DC")
        .album("ar-1", "al-1", "What? Live", 1992)
        .song("al-1", "s-1", "Who*Made*Who", 1, 7);
    let (h, content) = filesystem_harness(catalog).await;

    h.orchestrator()
        .full_sync(&NoopProgressSink, CancellationToken::new())
        .await
        .unwrap();

    assert!(content
        .path()
        .join("navidrome/ACDC/1992 - What Live/07 - WhoMadeWho.strm")
        .exists());
}

#[tokio::test]
async fn test_clear_removes_content_root() {
    let (h, content) = filesystem_harness(scenario_a()).await;
    let root = content.path().join("navidrome");

    h.orchestrator()
        .full_sync(&NoopProgressSink, CancellationToken::new())
        .await
        .unwrap();
    assert!(root.exists());

    let report = h.clearer().clear().await.unwrap();

    assert!(report.content_root_removed);
    assert!(!root.exists());
    assert!(content.path().exists());
    assert!(h.stats().await.is_empty());
}

#[tokio::test]
async fn test_resync_after_disc_added_keeps_recorded_files() {
    let first = FakeCatalog::new()
        .artist("ar-1", "Band")
        .album("ar-1", "al-1", "Growing", 2015)
        .song("al-1", "s-1", "One", 1, 1)
        .song("al-1", "s-2", "Two", 1, 2);
    let (mut h, content) = filesystem_harness(first).await;
    let root = content.path().join("navidrome");

    h.orchestrator()
        .full_sync(&NoopProgressSink, CancellationToken::new())
        .await
        .unwrap();

    h.catalog = Arc::new(
        FakeCatalog::new()
            .artist("ar-1", "Band")
            .album("ar-1", "al-1", "Growing", 2015)
            .song("al-1", "s-1", "One", 1, 1)
            .song("al-1", "s-2", "Two", 1, 2)
            .song("al-1", "s-3", "Three", 2, 1),
    );
    let report = h
        .orchestrator()
        .full_sync(&NoopProgressSink, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.stats.songs_added, 1);
    // .strm + .nfo for the new song only
    assert_eq!(report.stats.files_written, 2);

    let album_dir = root.join("Band").join("2015 - Growing");
    let files = pointer_files(&root);
    assert_eq!(
        files,
        vec![
            album_dir.join("01 - One.strm"),
            album_dir.join("02 - Two.strm"),
            album_dir.join("2-01 - Three.strm"),
        ]
    );
    assert_eq!(files, recorded_songs(&h).await);
}

#[tokio::test]
async fn test_incremental_then_full_share_artist_folder() {
    let credited = RemoteAlbum {
        id: "al-1".into(),
        name: "First Light".into(),
        artist: Some("Artist A & Friends".into()),
        artist_id: Some("ar-a".into()),
        year: Some(2019),
        genre: None,
        cover_art: None,
        song_count: Some(2),
    };
    let (h, content) = filesystem_harness(scenario_a().newest(vec![credited])).await;
    let root = content.path().join("navidrome");
    let orchestrator = h.orchestrator();

    orchestrator
        .incremental_sync(&NoopProgressSink, CancellationToken::new())
        .await
        .unwrap();
    let full = orchestrator
        .full_sync(&NoopProgressSink, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(full.stats.songs_added, 0);

    assert!(!root.join("Artist A").exists());
    let files = pointer_files(&root);
    assert_eq!(files.len(), 2);
    assert!(files
        .iter()
        .all(|f| f.starts_with(root.join("Artist A & Friends"))));
    assert_eq!(files, recorded_songs(&h).await);
}
