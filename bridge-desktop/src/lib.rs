//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop hosts
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `FileSystemAccess` using `tokio::fs`
//! - `SettingsStore` using a SQLite-backed key-value table
//! - `HostLibrary` using the host's JSON-RPC endpoint
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{JsonRpcHostLibrary, ReqwestHttpClient, TokioFileSystem};
//! use std::sync::Arc;
//!
//! let http = Arc::new(ReqwestHttpClient::new()?);
//! let host = JsonRpcHostLibrary::new(http.clone(), "http://localhost:8080/jsonrpc");
//! let fs = TokioFileSystem::new();
//! ```

mod filesystem;
mod host;
mod http;
mod settings;

pub use filesystem::TokioFileSystem;
pub use host::JsonRpcHostLibrary;
pub use http::ReqwestHttpClient;
pub use settings::SqliteSettingsStore;
