//! # Repository Pattern Implementation
//!
//! Read-side access to the host media library. Writes go through
//! [`LibraryTransaction`](crate::store::LibraryTransaction) instead.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//!
//! ## Available Repositories
//!
//! - `ArtistRepository` - Artists, owned and host-native
//! - `AlbumRepository` - Albums and their artist links
//! - `SongRepository` - Songs, including consistency checks on owned rows
//! - `PathRepository` - Directory/URI roots songs hang off
//! - `LibraryStats` - Owned-row counts across every table

pub mod album;
pub mod artist;
pub mod path;
pub mod song;
pub mod stats;

pub use album::{AlbumRepository, SqliteAlbumRepository};
pub use artist::{ArtistRepository, SqliteArtistRepository};
pub use path::{PathRepository, SqlitePathRepository};
pub use song::{SongRepository, SqliteSongRepository};
pub use stats::LibraryStats;
