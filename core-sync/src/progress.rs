//! Progress reporting for long-running walks

use serde::{Deserialize, Serialize};

/// One progress update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncProgress {
    /// Completed share of the walk, `0.0..=1.0`
    pub fraction: f64,
    /// Human-readable label, usually the artist or album being processed
    pub label: String,
    pub processed: u64,
    pub total: u64,
}

impl SyncProgress {
    pub fn new(processed: u64, total: u64, label: impl Into<String>) -> Self {
        let fraction = if total == 0 {
            1.0
        } else {
            (processed as f64 / total as f64).min(1.0)
        };
        Self {
            fraction,
            label: label.into(),
            processed,
            total,
        }
    }

    pub fn percent(&self) -> u8 {
        (self.fraction * 100.0).round() as u8
    }
}

/// Receives progress updates from the orchestrator.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: &SyncProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&SyncProgress) + Send + Sync,
{
    fn report(&self, progress: &SyncProgress) {
        self(progress)
    }
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn report(&self, _progress: &SyncProgress) {}
}
