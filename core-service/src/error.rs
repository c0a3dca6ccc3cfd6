use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[cfg(feature = "desktop-shims")]
    #[error("Subsonic error: {0}")]
    Subsonic(#[from] provider_subsonic::SubsonicError),
}

impl CoreError {
    /// True when another sync or clear currently holds the lease.
    pub fn is_lock_contention(&self) -> bool {
        matches!(self, CoreError::Sync(core_sync::SyncError::LockContention(_)))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
