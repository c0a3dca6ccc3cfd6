//! # Sync Engine Configuration
//!
//! One immutable value describing how the sync engine behaves, built once at
//! startup and handed to every component constructor as
//! `Arc<SyncEngineConfig>`.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern. [`SyncEngineConfigBuilder::build`]
//! fills defaults and validates the result fail-fast, so a component never has
//! to second-guess a value it was given.
//!
//! ## Usage
//!
//! ### Database-only mirroring
//!
//! ```
//! use core_runtime::config::SyncEngineConfig;
//!
//! let config = SyncEngineConfig::builder()
//!     .database_path("/var/lib/media/MyMusic.db")
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.source_namespace, "navidrome");
//! assert_eq!(config.incremental_window, 50);
//! ```
//!
//! ### Filesystem materialization
//!
//! ```
//! use core_runtime::config::{FilesystemOptions, MaterializationMode, SyncEngineConfig};
//!
//! let config = SyncEngineConfig::builder()
//!     .database_path("/var/lib/media/MyMusic.db")
//!     .materialization(MaterializationMode::Filesystem(
//!         FilesystemOptions::new("/srv/music/navidrome").with_artwork(false),
//!     ))
//!     .build()
//!     .expect("valid config");
//!
//! assert!(config.is_filesystem());
//! ```
//!
//! ## Error Handling
//!
//! Invalid or missing values produce [`Error::Config`] with a message naming
//! the offending field:
//!
//! ```should_panic
//! use core_runtime::config::SyncEngineConfig;
//!
//! // No database path
//! let config = SyncEngineConfig::builder()
//!     .build()
//!     .expect("Should fail - missing database path");
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default owner tag and external-key scheme.
pub const DEFAULT_NAMESPACE: &str = "navidrome";

/// Default playback URI root used when songs are not materialized on disk.
pub const DEFAULT_PLAYBACK_BASE: &str = "plugin://plugin.audio.navidrome/";

/// Largest page the Subsonic `getAlbumList2` endpoint serves.
pub const MAX_ALBUM_PAGE_SIZE: u32 = 500;

/// What to do when the store rejects a single record's write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StoreErrorPolicy {
    /// Stop the walk; nothing after the failing record is attempted.
    #[default]
    Abort,
    /// Log the failure, count it as a warning, continue with the next record.
    SkipRecord,
}

/// Options for mirroring the catalog onto disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemOptions {
    /// Directory owned exclusively by the engine
    pub content_root: PathBuf,
    /// Extension of stream-pointer files, without the dot
    pub stream_extension: String,
    /// Maximum length, in characters, of one sanitized path component
    pub max_name_length: usize,
    /// Download `folder.jpg` for artists and albums
    pub download_artwork: bool,
    /// Requested cover-art edge length in pixels
    pub artwork_size: u32,
}

impl FilesystemOptions {
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
            stream_extension: "strm".to_string(),
            max_name_length: 100,
            download_artwork: true,
            artwork_size: 600,
        }
    }

    pub fn with_stream_extension(mut self, extension: impl Into<String>) -> Self {
        self.stream_extension = extension.into();
        self
    }

    pub fn with_max_name_length(mut self, length: usize) -> Self {
        self.max_name_length = length;
        self
    }

    pub fn with_artwork(mut self, download: bool) -> Self {
        self.download_artwork = download;
        self
    }

    pub fn with_artwork_size(mut self, size: u32) -> Self {
        self.artwork_size = size;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.content_root.as_os_str().is_empty() {
            return Err(Error::Config("Content root cannot be empty".to_string()));
        }

        if self.content_root.parent().is_none() {
            return Err(Error::Config(
                "Content root cannot be a filesystem root; it is deleted on clear".to_string(),
            ));
        }

        let ext = &self.stream_extension;
        if ext.is_empty() || ext.contains(['.', '/', '\\']) {
            return Err(Error::Config(format!(
                "Stream extension '{}' must be a bare extension like 'strm'",
                ext
            )));
        }

        if !(16..=255).contains(&self.max_name_length) {
            return Err(Error::Config(format!(
                "Max name length {} must be between 16 and 255",
                self.max_name_length
            )));
        }

        if self.artwork_size == 0 {
            return Err(Error::Config(
                "Artwork size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// How synced entries are exposed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaterializationMode {
    /// Rows only; songs point at playback URIs.
    #[default]
    Database,
    /// Rows plus a mirrored directory tree of stream-pointer and sidecar files.
    Filesystem(FilesystemOptions),
}

/// Immutable sync engine configuration.
///
/// Use [`SyncEngineConfig::builder`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEngineConfig {
    /// Owner tag written on every row and prefix of every external key
    pub source_namespace: String,

    /// Path to the host library SQLite database
    pub database_path: PathBuf,

    /// Lease file guarding concurrent syncs
    pub lock_path: PathBuf,

    /// Age after which a lease is considered abandoned
    pub lock_ttl: Duration,

    /// Upper bound on any single remote catalog call
    pub request_timeout: Duration,

    /// Number of newest albums an incremental sync examines
    pub incremental_window: u32,

    /// Page size used when listing albums
    pub album_page_size: u32,

    /// Handling of store write failures on individual records
    pub store_error_policy: StoreErrorPolicy,

    /// Playback URI root for database-only mode
    pub playback_base: String,

    /// Database-only or filesystem mirroring
    pub materialization: MaterializationMode,
}

impl SyncEngineConfig {
    /// Creates a new builder for constructing a `SyncEngineConfig`.
    pub fn builder() -> SyncEngineConfigBuilder {
        SyncEngineConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        let ns = &self.source_namespace;
        if ns.is_empty() {
            return Err(Error::Config("Source namespace cannot be empty".to_string()));
        }

        if !ns
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(Error::Config(format!(
                "Source namespace '{}' may only contain ASCII letters, digits, '-', '_' and '.'",
                ns
            )));
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.lock_path.as_os_str().is_empty() {
            return Err(Error::Config("Lock path cannot be empty".to_string()));
        }

        if self.lock_ttl.is_zero() {
            return Err(Error::Config(
                "Lock TTL must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.incremental_window == 0 {
            return Err(Error::Config(
                "Incremental window must be at least 1 album".to_string(),
            ));
        }

        if self.album_page_size == 0 || self.album_page_size > MAX_ALBUM_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Album page size {} must be between 1 and {}",
                self.album_page_size, MAX_ALBUM_PAGE_SIZE
            )));
        }

        if self.playback_base.trim().is_empty() {
            return Err(Error::Config("Playback base cannot be empty".to_string()));
        }

        if let MaterializationMode::Filesystem(options) = &self.materialization {
            options.validate()?;
        }

        Ok(())
    }

    pub fn is_filesystem(&self) -> bool {
        matches!(self.materialization, MaterializationMode::Filesystem(_))
    }

    /// Content root when materializing to disk.
    pub fn content_root(&self) -> Option<&Path> {
        match &self.materialization {
            MaterializationMode::Filesystem(options) => Some(options.content_root.as_path()),
            MaterializationMode::Database => None,
        }
    }
}

/// Builder for constructing [`SyncEngineConfig`] instances.
#[derive(Debug, Default)]
pub struct SyncEngineConfigBuilder {
    source_namespace: Option<String>,
    database_path: Option<PathBuf>,
    lock_path: Option<PathBuf>,
    lock_ttl: Option<Duration>,
    request_timeout: Option<Duration>,
    incremental_window: Option<u32>,
    album_page_size: Option<u32>,
    store_error_policy: Option<StoreErrorPolicy>,
    playback_base: Option<String>,
    materialization: Option<MaterializationMode>,
}

impl SyncEngineConfigBuilder {
    /// Sets the owner namespace. Default: `navidrome`.
    pub fn source_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.source_namespace = Some(namespace.into());
        self
    }

    /// Sets the host library database path (required).
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::SyncEngineConfig;
    ///
    /// let builder = SyncEngineConfig::builder()
    ///     .database_path("/var/lib/media/MyMusic.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the lease file path.
    ///
    /// Default: `<temp dir>/<namespace>_sync.lock`
    pub fn lock_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.lock_path = Some(path.into());
        self
    }

    /// Sets the lease TTL. Default: 1 hour.
    pub fn lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = Some(ttl);
        self
    }

    /// Sets the per-call remote timeout. Default: 10 seconds.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the incremental "newest" window. Default: 50 albums.
    pub fn incremental_window(mut self, albums: u32) -> Self {
        self.incremental_window = Some(albums);
        self
    }

    /// Sets the album listing page size. Default: 500.
    pub fn album_page_size(mut self, size: u32) -> Self {
        self.album_page_size = Some(size);
        self
    }

    /// Sets the per-record store failure policy. Default: abort.
    pub fn store_error_policy(mut self, policy: StoreErrorPolicy) -> Self {
        self.store_error_policy = Some(policy);
        self
    }

    /// Sets the playback URI root for database-only mode.
    pub fn playback_base(mut self, base: impl Into<String>) -> Self {
        self.playback_base = Some(base.into());
        self
    }

    /// Selects database-only or filesystem mirroring. Default: database-only.
    pub fn materialization(mut self, mode: MaterializationMode) -> Self {
        self.materialization = Some(mode);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the database path is missing or any
    /// value fails [`SyncEngineConfig::validate`].
    pub fn build(self) -> Result<SyncEngineConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config(
                "Database path is required. Call .database_path() with the host library database."
                    .to_string(),
            )
        })?;

        let source_namespace = self
            .source_namespace
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let lock_path = self
            .lock_path
            .unwrap_or_else(|| std::env::temp_dir().join(format!("{}_sync.lock", source_namespace)));

        let config = SyncEngineConfig {
            source_namespace,
            database_path,
            lock_path,
            lock_ttl: self.lock_ttl.unwrap_or(Duration::from_secs(3600)),
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(10)),
            incremental_window: self.incremental_window.unwrap_or(50),
            album_page_size: self.album_page_size.unwrap_or(MAX_ALBUM_PAGE_SIZE),
            store_error_policy: self.store_error_policy.unwrap_or_default(),
            playback_base: self
                .playback_base
                .unwrap_or_else(|| DEFAULT_PLAYBACK_BASE.to_string()),
            materialization: self.materialization.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
