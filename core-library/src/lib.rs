//! # Host Library Store
//!
//! Owns access to the host media-library database the sync engine writes into.
//!
//! ## Overview
//!
//! This crate manages:
//! - SQLite connection pooling and schema migrations ([`db`])
//! - Local record models and namespaced external keys ([`models`])
//! - Transactional writes of engine-owned rows ([`store`])
//! - Read repositories and owned-content statistics ([`repositories`])

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod store;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
pub use models::{
    AlbumArtistLink, AlbumKey, ArtistKey, ExternalKey, LocalAlbum, LocalArtist, LocalPath,
    LocalSong, NewAlbum, NewArtist, NewSong, PathKey, SongArtistLink, SongKey,
};
pub use repositories::LibraryStats;
pub use store::{ClearedCounts, LibraryTransaction};
