//! Workspace umbrella crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates. Host applications can depend on `library-sync-workspace`
//! and enable `desktop-shims` to get the fully wired [`SyncService`] without
//! needing to depend on each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::{bootstrap_desktop, CoreDependencies, CoreError, DesktopOptions, SyncService};
