// src/lib.rs

//! AppNest desktop integration engine
//!
//! Integrates portable AppImage bundles into an XDG desktop: moves an image to
//! a canonical location, synthesizes its launcher entry with contextual actions,
//! resolves display-name collisions and cleans up entries whose image is gone.
//!
//! # Architecture
//!
//! - Images: format inspection and content-addressed naming (`image`)
//! - Launcher documents: round-tripping key-file model, collision resolution
//!   and action synthesis (`desktop`)
//! - Integration: the relocation state machine with its confirmation and
//!   error-reporting collaborators (`integration`)
//! - Maintenance: stale entry collection, staleness heuristics and cache
//!   refreshes (`maintenance`)

pub mod config;
pub mod desktop;
mod error;
pub mod filesystem;
pub mod image;
pub mod integration;
pub mod maintenance;
pub mod paths;

pub use error::{Error, Result};

/// Version string stamped into generated launcher entries
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
