use bridge_traits::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync already in progress (lease held at {0})")]
    LockContention(String),

    #[error("Remote catalog unreachable: {0}")]
    Connectivity(String),

    #[error("Store integrity error: {0}")]
    StoreIntegrity(String),

    #[error("Malformed {entity} record '{id}': {reason}")]
    MalformedRecord {
        entity: &'static str,
        id: String,
        reason: String,
    },

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Materialization failed: {0}")]
    Materialization(String),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },
}

impl SyncError {
    /// Classify a collaborator failure raised while fetching `entity` `id`.
    ///
    /// `NotFound` and `Malformed` only spoil the one record; everything else
    /// means the remote side cannot be trusted for the rest of the walk.
    pub fn from_bridge(err: BridgeError, entity: &'static str, id: &str) -> Self {
        match err {
            BridgeError::NotFound(reason) | BridgeError::Malformed(reason) => {
                SyncError::MalformedRecord {
                    entity,
                    id: id.to_string(),
                    reason,
                }
            }
            BridgeError::Io(e) => SyncError::Io(e),
            other => SyncError::Connectivity(other.to_string()),
        }
    }

    /// Classify a store failure raised while writing one record.
    pub fn from_store(err: LibraryError, entity: &'static str, id: &str) -> Self {
        match err {
            LibraryError::InvalidInput { message, .. } => SyncError::MalformedRecord {
                entity,
                id: id.to_string(),
                reason: message,
            },
            LibraryError::Database(e) => SyncError::StoreIntegrity(e.to_string()),
            other => SyncError::Library(other),
        }
    }

    /// True when the failure is confined to a single record and the walk may
    /// continue.
    pub fn is_record_level(&self) -> bool {
        matches!(self, SyncError::MalformedRecord { .. })
    }

    pub fn is_store_integrity(&self) -> bool {
        matches!(self, SyncError::StoreIntegrity(_))
    }

    /// True when the remote side failed the whole walk.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SyncError::Connectivity(_))
    }
}

impl From<core_runtime::Error> for SyncError {
    fn from(err: core_runtime::Error) -> Self {
        SyncError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
