//! Host Media-Library Integration
//!
//! Lets the sync engine ask the host application to re-index content it has
//! written, or to prune entries whose backing files disappeared.

use async_trait::async_trait;

use crate::error::Result;

/// Host media-library control surface.
#[async_trait]
pub trait HostLibrary: Send + Sync {
    /// Request a rescan limited to `scope` (a directory or playback URI root).
    async fn request_rescan(&self, scope: &str) -> Result<()>;

    /// Request removal of library entries whose sources no longer exist.
    async fn request_clean(&self) -> Result<()>;
}

/// Host integration that accepts every request and does nothing.
///
/// Used when the engine runs without a reachable host (tests, headless runs).
#[derive(Debug, Clone, Default)]
pub struct NoopHostLibrary;

#[async_trait]
impl HostLibrary for NoopHostLibrary {
    async fn request_rescan(&self, _scope: &str) -> Result<()> {
        Ok(())
    }

    async fn request_clean(&self) -> Result<()> {
        Ok(())
    }
}
