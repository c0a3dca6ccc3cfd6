//! Errors raised by the host library store.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    /// Any SQLite failure, including `database is locked` once the busy
    /// timeout has elapsed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A record was rejected before any SQL ran.
    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Migration failed: {0}")]
    Migration(String),
}

pub type Result<T> = std::result::Result<T, LibraryError>;
