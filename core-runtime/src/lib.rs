//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the sync engine crates:
//! - Logging and tracing setup with credential redaction
//! - The immutable [`SyncEngineConfig`](config::SyncEngineConfig)
//! - The event bus used to report sync progress and library changes
//!
//! ## Overview
//!
//! Nothing in here talks to the remote catalog or the host database. The
//! crate only establishes the conventions that `core-sync` and
//! `core-service` build on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
