//! # Host Bridge Traits
//!
//! Seams between the library sync engine and everything it does not own.
//!
//! ## Overview
//!
//! The engine reads a remote music catalog, writes a host media-library
//! database, optionally mirrors entries onto disk, and pokes the host to
//! re-index. Each of those collaborators sits behind a trait defined here so
//! the engine can be driven by real adapters (`bridge-desktop`,
//! `provider-subsonic`) or by in-process fakes in tests.
//!
//! ## Traits
//!
//! ### Remote catalog
//! - [`RemoteCatalogClient`](catalog::RemoteCatalogClient) - Read-only artists/albums/songs plus stream and cover-art URLs
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations
//! - [`FileSystemAccess`](storage::FileSystemAccess) - File I/O for materialized content
//!
//! ### Host integration
//! - [`HostLibrary`](host::HostLibrary) - Library rescan and clean requests
//! - [`SettingsStore`](storage::SettingsStore) - Key-value persisted state
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Its
//! variants separate "absent" (`NotFound`), "unreachable" (`Connectivity`)
//! and "unparseable" (`Malformed`) so that callers never have to infer intent
//! from a generic failure. Implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Provide actionable error messages
//! - Include error context (e.g., file paths, remote ids)
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks. Implementations must ensure thread safety.

pub mod catalog;
pub mod error;
pub mod host;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use catalog::{
    AlbumDetail, AlbumListType, ArtistDetail, RemoteAlbum, RemoteArtist, RemoteCatalogClient,
    RemoteSong,
};
pub use host::{HostLibrary, NoopHostLibrary};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::{FileSystemAccess, SettingsStore};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
