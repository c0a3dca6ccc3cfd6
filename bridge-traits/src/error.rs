use thiserror::Error;

/// Errors surfaced by host bridges and remote collaborators.
///
/// The variants are deliberately coarse: callers branch on the *kind* of
/// failure (absent, unreachable, unparseable) rather than on transport details.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Remote unreachable: {0}")]
    Connectivity(String),

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// True when the remote side could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, BridgeError::Connectivity(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
