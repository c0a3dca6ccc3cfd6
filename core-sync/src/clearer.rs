//! # Library Clearer
//!
//! Reverses everything the engine wrote for one namespace: owned rows in
//! dependency order (join rows, songs, albums, artists, paths), the
//! materialized content root, and the persisted last-sync time. Rows without
//! the namespace's owner tag are never touched.

use bridge_traits::host::HostLibrary;
use core_library::{ClearedCounts, LibraryTransaction};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    error::{Result, SyncError},
    lock::SyncLockManager,
    materializer::ResourceMaterializer,
    state::SyncStateStore,
};

/// What [`LibraryClearer::clear`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearReport {
    pub counts: ClearedCounts,
    pub content_root_removed: bool,
}

pub struct LibraryClearer {
    pool: SqlitePool,
    namespace: String,
    locks: SyncLockManager,
    materializer: Arc<dyn ResourceMaterializer>,
    state: SyncStateStore,
    host: Arc<dyn HostLibrary>,
    event_bus: EventBus,
}

impl LibraryClearer {
    pub fn new(
        pool: SqlitePool,
        namespace: impl Into<String>,
        locks: SyncLockManager,
        materializer: Arc<dyn ResourceMaterializer>,
        state: SyncStateStore,
        host: Arc<dyn HostLibrary>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
            locks,
            materializer,
            state,
            host,
            event_bus,
        }
    }

    /// Remove every owned row and file. Fails with `LockContention` while a
    /// sync holds the lease.
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn clear(&self) -> Result<ClearReport> {
        let Some(lease) = self.locks.try_acquire("clear").await? else {
            return Err(SyncError::LockContention(
                self.locks.path().display().to_string(),
            ));
        };

        let result = self.clear_locked().await;

        if let Err(e) = lease.release().await {
            warn!(error = %e, "Failed to release sync lease");
        }
        result
    }

    async fn clear_locked(&self) -> Result<ClearReport> {
        let mut tx = LibraryTransaction::begin(&self.pool)
            .await
            .map_err(|e| SyncError::StoreIntegrity(e.to_string()))?;
        let counts = tx
            .delete_owned(&self.namespace)
            .await
            .map_err(|e| SyncError::StoreIntegrity(e.to_string()))?;
        tx.commit()
            .await
            .map_err(|e| SyncError::StoreIntegrity(e.to_string()))?;

        let content_root_removed = self.materializer.purge().await?;
        self.state.reset().await?;

        info!(
            rows_removed = counts.total(),
            songs = counts.songs,
            albums = counts.albums,
            artists = counts.artists,
            content_root_removed,
            "Cleared synced library content"
        );
        self.event_bus
            .emit(CoreEvent::Library(LibraryEvent::Cleared {
                namespace: self.namespace.clone(),
                rows_removed: counts.total(),
                content_root_removed,
            }))
            .ok();

        match self.host.request_clean().await {
            Ok(()) => {
                self.event_bus
                    .emit(CoreEvent::Library(LibraryEvent::CleanRequested))
                    .ok();
            }
            Err(e) => warn!(error = %e, "Host clean request failed"),
        }

        Ok(ClearReport {
            counts,
            content_root_removed,
        })
    }
}
