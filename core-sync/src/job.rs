//! Sync run lifecycle
//!
//! ```text
//! Idle -> Locking -> Walking -> Committing -> Done
//!           |          |            |
//!           +--> Aborted            |
//!           +--> Failed <-----------+
//! ```
//!
//! `Aborted` is lock contention, cancellation or lost connectivity.
//! `Failed` is anything else that stops a run after the lease is held.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Result, SyncError};

/// Correlates the events and log lines of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncJobId(Uuid);

impl SyncJobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SyncJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SyncJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Locking,
    Walking,
    Committing,
    Done,
    Aborted,
    Failed,
}

impl SyncPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Locking => "locking",
            Self::Walking => "walking",
            Self::Committing => "committing",
            Self::Done => "done",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }

    fn can_move_to(self, next: SyncPhase) -> bool {
        use SyncPhase::*;
        match self {
            Idle => matches!(next, Locking | Aborted),
            Locking => matches!(next, Walking | Aborted | Failed),
            Walking => matches!(next, Committing | Aborted | Failed),
            Committing => matches!(next, Done | Failed),
            Done | Aborted | Failed => false,
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncType {
    /// Every artist, album and song in the catalog
    Full,
    /// The newest-albums window only
    Incremental,
}

impl SyncType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SyncJob {
    pub id: SyncJobId,
    pub sync_type: SyncType,
    pub phase: SyncPhase,
    /// Artists (full) or albums (incremental) handled so far
    pub items_processed: u64,
    pub items_total: Option<u64>,
    /// Reason for `Aborted`/`Failed`
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncJob {
    pub fn new(sync_type: SyncType) -> Self {
        Self {
            id: SyncJobId::new(),
            sync_type,
            phase: SyncPhase::Idle,
            items_processed: 0,
            items_total: None,
            error_message: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn transition(&mut self, next: SyncPhase) -> Result<()> {
        if !self.phase.can_move_to(next) {
            return Err(SyncError::InvalidStateTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
                reason: format!("{} job {} cannot go from {} to {}", self.sync_type, self.id, self.phase, next),
            });
        }
        self.phase = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn abort(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(SyncPhase::Aborted)?;
        self.error_message = Some(reason.into());
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(SyncPhase::Failed)?;
        self.error_message = Some(reason.into());
        Ok(())
    }

    pub fn record_progress(&mut self, processed: u64, total: Option<u64>) {
        self.items_processed = processed;
        self.items_total = total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walking(sync_type: SyncType) -> SyncJob {
        let mut job = SyncJob::new(sync_type);
        job.transition(SyncPhase::Locking).unwrap();
        job.transition(SyncPhase::Walking).unwrap();
        job
    }

    #[test]
    fn test_full_run_reaches_done() {
        let mut job = walking(SyncType::Full);
        job.record_progress(3, Some(3));
        job.transition(SyncPhase::Committing).unwrap();
        job.transition(SyncPhase::Done).unwrap();

        assert!(job.phase.is_terminal());
        assert!(job.finished_at.is_some());
        assert!(job.error_message.is_none());
        assert_eq!(job.items_processed, 3);
    }

    #[test]
    fn test_contention_aborts_while_locking() {
        let mut job = SyncJob::new(SyncType::Incremental);
        job.transition(SyncPhase::Locking).unwrap();
        job.abort("sync already in progress").unwrap();

        assert_eq!(job.phase, SyncPhase::Aborted);
        assert_eq!(job.error_message.as_deref(), Some("sync already in progress"));
    }

    #[test]
    fn test_commit_failure() {
        let mut job = walking(SyncType::Full);
        job.transition(SyncPhase::Committing).unwrap();
        job.fail("database is locked").unwrap();

        assert_eq!(job.phase, SyncPhase::Failed);
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn test_committing_cannot_abort() {
        let mut job = walking(SyncType::Full);
        job.transition(SyncPhase::Committing).unwrap();
        assert!(job.abort("cancelled").is_err());
        assert_eq!(job.phase, SyncPhase::Committing);
    }

    #[test]
    fn test_cannot_skip_walking() {
        let mut job = SyncJob::new(SyncType::Full);
        job.transition(SyncPhase::Locking).unwrap();

        let err = job.transition(SyncPhase::Committing).unwrap_err();
        assert!(matches!(err, SyncError::InvalidStateTransition { .. }));
        assert_eq!(job.phase, SyncPhase::Locking);
    }

    #[test]
    fn test_terminal_phases_are_final() {
        let mut job = SyncJob::new(SyncType::Full);
        job.transition(SyncPhase::Aborted).unwrap();

        assert!(job.transition(SyncPhase::Locking).is_err());
        assert!(job.fail("late").is_err());
    }

    #[test]
    fn test_serialized_forms_match_display() {
        let id = SyncJobId::new();
        assert_eq!(serde_json::to_value(id).unwrap(), serde_json::json!(id.to_string()));
        assert_eq!(serde_json::to_value(SyncType::Full).unwrap(), serde_json::json!("full"));

        let parsed: SyncType = serde_json::from_str("\"incremental\"").unwrap();
        assert_eq!(parsed, SyncType::Incremental);
    }

    #[test]
    fn test_display() {
        assert_eq!(SyncType::Incremental.to_string(), "incremental");
        assert_eq!(SyncPhase::Committing.to_string(), "committing");
        assert_eq!(SyncJobId::new().to_string().len(), 36);
    }
}
