//! # Event Bus System
//!
//! Broadcasts what the sync engine is doing to anyone who cares: a progress
//! dialog, a notification area, a test assertion. Built on
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: `CoreEvent` wrapping per-domain enums (`SyncEvent`, `LibraryEvent`)
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Sync(SyncEvent::LockContended {
//!         operation: "full_sync".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Sync already in progress");
//! # }
//! ```
//!
//! ## Event Types
//!
//! ### Sync Events
//! - `Started`: Sync job acquired the lease and began walking
//! - `Progress`: Fraction of the walk completed plus a label
//! - `Completed`: Walk finished, counts of new records
//! - `Failed`: Walk aborted on a connectivity or store failure
//! - `Cancelled`: Walk stopped at a cancellation checkpoint
//! - `LockContended`: Another sync holds the lease
//!
//! ### Library Events
//! - `Cleared`: Owned rows (and content root) removed
//! - `RescanRequested`: Host asked to re-index the content scope
//! - `CleanRequested`: Host asked to prune dead entries
//!
//! Publishing never blocks the engine. A subscriber that falls more than the
//! channel capacity behind gets `RecvError::Lagged` and may keep reading.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

use tokio::sync::broadcast::error::TryRecvError;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Capacity used by `EventBus::default()`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Sync job lifecycle
    Sync(SyncEvent),
    /// Library-wide changes and host requests
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::LockContended { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::Cancelled { .. }) => EventSeverity::Info,
            CoreEvent::Library(LibraryEvent::Cleared { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events related to a sync run against the remote catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// Sync job acquired the lease and started walking.
    Started {
        /// Unique identifier for this sync job.
        job_id: String,
        /// Owner namespace being synced (e.g. "navidrome").
        namespace: String,
        /// Whether this is a full or incremental sync.
        is_full_sync: bool,
    },
    /// Progress update during the walk.
    Progress {
        /// The sync job ID.
        job_id: String,
        /// Units processed so far (artists for full, albums for incremental).
        items_processed: u64,
        /// Total units, when known up front.
        total_items: Option<u64>,
        /// Progress percentage (0-100).
        percent: u8,
        /// Current label (e.g. the artist being walked).
        phase: String,
    },
    /// Walk finished.
    Completed {
        /// The sync job ID.
        job_id: String,
        /// New artist rows.
        artists_added: u64,
        /// New album rows.
        albums_added: u64,
        /// New song rows.
        songs_added: u64,
        /// Records skipped as malformed or unavailable.
        warnings: u64,
        /// Duration of sync in seconds.
        duration_secs: u64,
    },
    /// Walk aborted.
    Failed {
        /// The sync job ID.
        job_id: String,
        /// Human-readable error message.
        message: String,
        /// Units processed before failure.
        items_processed: u64,
        /// Whether a later run can be expected to succeed.
        recoverable: bool,
    },
    /// Walk stopped at a cancellation checkpoint.
    Cancelled {
        /// The sync job ID.
        job_id: String,
        /// Units processed before cancellation.
        items_processed: u64,
    },
    /// Another sync or clear currently holds the lease.
    LockContended {
        /// The operation that was refused.
        operation: String,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync started",
            SyncEvent::Progress { .. } => "Sync in progress",
            SyncEvent::Completed { .. } => "Sync completed successfully",
            SyncEvent::Failed { .. } => "Sync failed",
            SyncEvent::Cancelled { .. } => "Sync cancelled",
            SyncEvent::LockContended { .. } => "Sync already in progress",
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

/// Events related to library-wide changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// Every owned row was removed.
    Cleared {
        /// Owner namespace that was cleared.
        namespace: String,
        /// Total rows deleted across all tables.
        rows_removed: u64,
        /// Whether a materialized content root was deleted.
        content_root_removed: bool,
    },
    /// Host asked to rescan a scope.
    RescanRequested {
        /// Directory or URI root passed to the host.
        scope: String,
    },
    /// Host asked to clean its library.
    CleanRequested,
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::Cleared { .. } => "Synced library content cleared",
            LibraryEvent::RescanRequested { .. } => "Library rescan requested",
            LibraryEvent::CleanRequested => "Library clean requested",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel shared by every component that reports activity.
///
/// Cloning is cheap; all clones publish into the same channel. Receivers only
/// see events emitted after they subscribed.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` bounds how far a subscriber may fall behind before it
    /// receives `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to every current subscriber, returning how many there were.
    ///
    /// Fails only when nobody is listening; the engine calls `.ok()` on it.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Subscribe and wrap the receiver in an [`EventStream`].
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.sender.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver that drops events failing an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity};
///
/// let bus = EventBus::new(16);
/// let warnings = bus.stream().filter(|e| e.severity() >= EventSeverity::Warning);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |keep| keep(event))
    }

    /// Next matching event.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` after falling `n` events behind, `RecvError::Closed`
    /// once every sender is gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Next matching event already buffered, or `None`.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(n)) => return Some(Err(RecvError::Lagged(n))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            };
            if self.accepts(&event) {
                return Some(Ok(event));
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
