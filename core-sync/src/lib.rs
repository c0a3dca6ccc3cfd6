//! # Library Sync Engine
//!
//! Mirrors a remote music catalog into the host media library.
//!
//! ## Overview
//!
//! A sync walks the remote catalog depth-first (artist → albums → songs),
//! maps each remote entity onto exactly one owned local row, optionally
//! mirrors it onto disk, and asks the host to rescan. Runs are serialized by
//! a lease file, cancellable between artists, and safe to repeat: an
//! unchanged catalog produces no new rows or files.
//!
//! ## Components
//!
//! - **Lock** (`lock`): Lease file with TTL-based reclaim of abandoned leases
//! - **Upsert** (`upsert`): Idempotent find-or-insert keyed on `"<namespace>://<id>"`
//! - **Materializer** (`materializer`): No-op or filesystem (`.strm` + `.nfo`) mirror
//! - **Orchestrator** (`orchestrator`): Full and incremental walks with the failure policy
//! - **Clearer** (`clearer`): Removes every owned row and file
//! - **Job** (`job`): Sync job state machine
//! - **Progress** (`progress`): Progress updates for callers
//! - **State** (`state`): Persisted last-sync time

pub mod clearer;
pub mod error;
pub mod job;
pub mod lock;
pub mod materializer;
pub mod orchestrator;
pub mod progress;
pub mod state;
pub mod upsert;

pub use clearer::{ClearReport, LibraryClearer};
pub use error::{Result, SyncError};
pub use job::{SyncJob, SyncJobId, SyncPhase, SyncType};
pub use lock::{LeaseInfo, SyncLease, SyncLockManager};
pub use materializer::{
    materializer_for, sanitize_component, FilesystemMaterializer, NullMaterializer,
    ResourceMaterializer, SongLocation,
};
pub use orchestrator::{SyncDependencies, SyncOrchestrator, SyncOutcome, SyncReport, SyncStats};
pub use progress::{NoopProgressSink, ProgressSink, SyncProgress};
pub use state::SyncStateStore;
pub use upsert::{StoredAlbum, StoredArtist, StoredSong, UpsertEngine, Upserted};
