//! # Sync Lease
//!
//! Process-wide mutual exclusion for anything that mutates the host library
//! or the content root.
//!
//! The lease is a small JSON file created with exclusive-create semantics.
//! A lease older than the configured TTL is treated as abandoned. Reclaiming
//! one renames it to a tombstone unique to the caller and checks that the
//! tombstone still holds the lease that was judged stale, so a reclaimer can
//! never delete a lease another process has just taken. The [`SyncLease`]
//! guard removes the file when released or dropped, which covers every exit
//! path of a sync.

use bridge_traits::time::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;

/// Contents of the lease file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseInfo {
    pub pid: u32,
    pub created_at: DateTime<Utc>,
    pub operation: String,
}

/// What sat at the lease path when it was inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    body: Vec<u8>,
    modified: Option<SystemTime>,
}

enum ExistingLease {
    Missing,
    Present { age: chrono::Duration, snapshot: Snapshot },
}

/// Hands out [`SyncLease`]s for one lease path.
#[derive(Clone)]
pub struct SyncLockManager {
    path: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SyncLockManager {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Try to take the lease for `operation`.
    ///
    /// Returns `Ok(None)` while another holder's lease is younger than the
    /// TTL, or when a competing process wins the race for a stale one.
    pub async fn try_acquire(&self, operation: &str) -> Result<Option<SyncLease>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        for _ in 0..3 {
            match self.create_lease(operation).await {
                Ok(lease) => return Ok(Some(lease)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }

            let (age, snapshot) = match self.inspect_existing().await? {
                ExistingLease::Missing => continue,
                ExistingLease::Present { age, snapshot } => (age, snapshot),
            };
            if !self.is_stale(age) {
                debug!(
                    path = %self.path.display(),
                    age_secs = age.num_seconds(),
                    "Lease is held by another sync"
                );
                return Ok(None);
            }

            info!(
                path = %self.path.display(),
                age_secs = age.num_seconds(),
                "Reclaiming abandoned lease"
            );
            if !self.reclaim(&snapshot).await? {
                return Ok(None);
            }
        }

        Ok(None)
    }

    /// True when a lease younger than the TTL exists.
    pub async fn is_held(&self) -> Result<bool> {
        Ok(match self.inspect_existing().await? {
            ExistingLease::Present { age, .. } => !self.is_stale(age),
            ExistingLease::Missing => false,
        })
    }

    fn is_stale(&self, age: chrono::Duration) -> bool {
        chrono::Duration::from_std(self.ttl)
            .map(|ttl| age >= ttl)
            .unwrap_or(false)
    }

    async fn create_lease(&self, operation: &str) -> io::Result<SyncLease> {
        let info = LeaseInfo {
            pid: std::process::id(),
            created_at: self.clock.now(),
            operation: operation.to_string(),
        };
        let body = serde_json::to_vec(&info).map_err(io::Error::other)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await?;

        let written = async {
            file.write_all(&body).await?;
            file.sync_all().await
        }
        .await;
        if let Err(e) = written {
            let _ = fs::remove_file(&self.path).await;
            return Err(e);
        }

        debug!(path = %self.path.display(), operation, "Lease acquired");
        Ok(SyncLease {
            path: self.path.clone(),
            info,
            released: false,
        })
    }

    /// Lease files that do not parse, including ones a holder has created but
    /// not yet written, are aged by modification time.
    async fn inspect_existing(&self) -> Result<ExistingLease> {
        match snapshot(&self.path).await? {
            None => Ok(ExistingLease::Missing),
            Some(snapshot) => {
                let created_at = match serde_json::from_slice::<LeaseInfo>(&snapshot.body) {
                    Ok(info) => info.created_at,
                    Err(_) => snapshot
                        .modified
                        .map(DateTime::<Utc>::from)
                        .unwrap_or_else(|| self.clock.now()),
                };
                Ok(ExistingLease::Present {
                    age: self.clock.now() - created_at,
                    snapshot,
                })
            }
        }
    }

    /// Move the stale lease out of the way. Returns `false` when the file at
    /// the lease path was no longer the one judged stale.
    async fn reclaim(&self, stale: &Snapshot) -> Result<bool> {
        let tombstone = self.tombstone_path();
        match fs::rename(&self.path, &tombstone).await {
            Ok(()) => {}
            // Someone else reclaimed it first; retry the create.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        }

        let moved = snapshot(&tombstone).await?;
        if moved.as_ref() == Some(stale) {
            remove_if_present(&tombstone).await?;
            return Ok(true);
        }

        // A fresh lease was taken between inspection and rename: put it back.
        match fs::hard_link(&tombstone, &self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!(path = %self.path.display(), "Lease was replaced while being restored");
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to restore lease");
            }
        }
        remove_if_present(&tombstone).await?;
        debug!(path = %self.path.display(), "Lost the race for a stale lease");
        Ok(false)
    }

    fn tombstone_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sync.lock".to_string());
        self.path.with_file_name(format!(
            "{}.{}.{}.stale",
            name,
            std::process::id(),
            Uuid::new_v4().simple()
        ))
    }
}

async fn snapshot(path: &Path) -> Result<Option<Snapshot>> {
    let body = match fs::read(path).await {
        Ok(body) => body,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let modified = match fs::metadata(path).await {
        Ok(meta) => meta.modified().ok(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(Snapshot { body, modified }))
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// A held lease. The file is removed on [`release`](Self::release) or drop.
#[derive(Debug)]
pub struct SyncLease {
    path: PathBuf,
    info: LeaseInfo,
    released: bool,
}

impl SyncLease {
    pub fn info(&self) -> &LeaseInfo {
        &self.info
    }

    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        remove_if_present(&self.path).await
    }
}

impl Drop for SyncLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Drop cannot await.
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove lease");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::time::ManualClock;
    use chrono::TimeZone;

    fn manager(dir: &tempfile::TempDir, clock: Arc<ManualClock>) -> SyncLockManager {
        SyncLockManager::new(dir.path().join("sync.lock"), Duration::from_secs(3600))
            .with_clock(clock)
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn leftovers(dir: &tempfile::TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let locks = manager(&dir, clock());

        let lease = locks.try_acquire("full_sync").await.unwrap().expect("lease");
        assert_eq!(lease.info().operation, "full_sync");
        assert!(locks.path().exists());
        assert!(locks.is_held().await.unwrap());

        lease.release().await.unwrap();
        assert!(!locks.path().exists());
        assert!(!locks.is_held().await.unwrap());
    }

    #[tokio::test]
    async fn test_fresh_lease_blocks_second_holder() {
        let dir = tempfile::tempdir().unwrap();
        let clock = clock();
        let locks = manager(&dir, clock.clone());

        let _held = locks.try_acquire("full_sync").await.unwrap().expect("lease");
        clock.advance(chrono::Duration::minutes(59));

        assert!(locks.try_acquire("incremental_sync").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_lease_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let clock = clock();
        let locks = manager(&dir, clock.clone());

        let abandoned = locks.try_acquire("full_sync").await.unwrap().expect("lease");
        std::mem::forget(abandoned);
        clock.advance(chrono::Duration::hours(1));

        let lease = locks.try_acquire("clear").await.unwrap().expect("reclaimed");
        assert_eq!(lease.info().operation, "clear");
        assert_eq!(leftovers(&dir), vec!["sync.lock"]);
    }

    #[tokio::test]
    async fn test_reclaim_spares_lease_taken_after_inspection() {
        let dir = tempfile::tempdir().unwrap();
        let clock = clock();
        let slow = manager(&dir, clock.clone());
        let fast = manager(&dir, clock.clone());

        std::mem::forget(slow.try_acquire("full_sync").await.unwrap().expect("lease"));
        clock.advance(chrono::Duration::hours(2));

        // Both see the same stale lease; the other process reclaims it first.
        let ExistingLease::Present { snapshot: seen, .. } = slow.inspect_existing().await.unwrap() else {
            panic!("lease should be present");
        };
        let winner = fast.try_acquire("incremental_sync").await.unwrap().expect("reclaimed");

        assert!(!slow.reclaim(&seen).await.unwrap());

        let on_disk: LeaseInfo =
            serde_json::from_slice(&std::fs::read(slow.path()).unwrap()).unwrap();
        assert_eq!(&on_disk, winner.info());
        assert!(slow.is_held().await.unwrap());
        assert_eq!(leftovers(&dir), vec!["sync.lock"]);
    }

    #[tokio::test]
    async fn test_unparsable_lease_ages_by_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let locks = manager(&dir, clock.clone());
        std::fs::write(locks.path(), b"{\"pid\": 41").unwrap();

        // A holder still writing its lease keeps it until the TTL runs out.
        assert!(locks.is_held().await.unwrap());
        assert!(locks.try_acquire("full_sync").await.unwrap().is_none());

        clock.advance(chrono::Duration::hours(2));
        assert!(!locks.is_held().await.unwrap());
        assert!(locks.try_acquire("full_sync").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_drop_releases_lease() {
        let dir = tempfile::tempdir().unwrap();
        let locks = manager(&dir, clock());

        {
            let _lease = locks.try_acquire("full_sync").await.unwrap().expect("lease");
        }

        assert!(!locks.path().exists());
        assert!(locks.try_acquire("full_sync").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_creates_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let locks = SyncLockManager::new(
            dir.path().join("nested/state/sync.lock"),
            Duration::from_secs(60),
        );

        assert!(locks.try_acquire("full_sync").await.unwrap().is_some());
    }
}
