//! Filesystem and persisted-state seams
//!
//! The materializer only ever needs to probe, create and write below its
//! content root, and to drop the whole root on clear. The settings store keeps
//! small scalar values (the last-sync stamp) outside the host database.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

use crate::error::Result;

/// Filesystem operations used when mirroring the catalog as `.strm`/`.nfo`
/// files.
///
/// ```ignore
/// async fn write_pointer(fs: &dyn FileSystemAccess, dir: &Path, url: String) -> Result<()> {
///     fs.create_dir_all(dir).await?;
///     fs.write_file(&dir.join("01 - Intro.strm"), Bytes::from(url)).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    async fn exists(&self, path: &Path) -> Result<bool>;

    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Creates or truncates `path`. Missing parent directories are created.
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Recursively removes a directory tree.
    async fn delete_dir_all(&self, path: &Path) -> Result<()>;
}

/// Persisted key-value state.
///
/// Values are typed: reading a key through the wrong getter is
/// [`BridgeError::Malformed`](crate::error::BridgeError::Malformed).
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    async fn get_i64(&self, key: &str) -> Result<Option<i64>>;

    async fn set_i64(&self, key: &str, value: i64) -> Result<()>;

    /// Removing a key that does not exist is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
