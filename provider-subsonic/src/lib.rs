//! # Subsonic Provider
//!
//! Implements `RemoteCatalogClient` over the Subsonic REST API as served by
//! Navidrome and other compatible servers.
//!
//! ## Overview
//!
//! This module provides:
//! - Password authentication with hex-encoded (`enc:`) credentials
//! - Artist index flattening (`getArtists`), artist and album detail
//! - Paginated album listings (`getAlbumList2`) in every sort order
//! - Stream and cover-art URL construction, honoring transcoding settings
//! - Bounded retry with exponential backoff on throttling and server errors

pub mod config;
pub mod connector;
pub mod error;
pub mod types;

pub use config::{SubsonicConfig, TranscodeFormat, TranscodeSettings, TRANSCODE_BITRATES};
pub use connector::SubsonicClient;
pub use error::{Result, SubsonicError};
