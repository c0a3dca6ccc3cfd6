//! Persisted sync state

use bridge_traits::storage::SettingsStore;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, SyncError};

/// Reads and writes the last successful full-sync time for one namespace.
#[derive(Clone)]
pub struct SyncStateStore {
    settings: Arc<dyn SettingsStore>,
    key: String,
}

impl SyncStateStore {
    pub fn new(settings: Arc<dyn SettingsStore>, namespace: &str) -> Self {
        Self {
            settings,
            key: format!("{}.last_sync", namespace),
        }
    }

    /// `None` means never synced (or cleared since).
    pub async fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        let secs = self
            .settings
            .get_i64(&self.key)
            .await
            .map_err(|e| SyncError::Config(format!("Failed to read {}: {}", self.key, e)))?;

        Ok(secs.and_then(|s| Utc.timestamp_opt(s, 0).single()))
    }

    pub async fn record(&self, at: DateTime<Utc>) -> Result<()> {
        self.settings
            .set_i64(&self.key, at.timestamp())
            .await
            .map_err(|e| SyncError::Config(format!("Failed to write {}: {}", self.key, e)))?;
        debug!(key = %self.key, at = %at, "Recorded last sync");
        Ok(())
    }

    pub async fn reset(&self) -> Result<()> {
        self.settings
            .delete(&self.key)
            .await
            .map_err(|e| SyncError::Config(format!("Failed to reset {}: {}", self.key, e)))?;
        debug!(key = %self.key, "Reset last sync");
        Ok(())
    }
}
