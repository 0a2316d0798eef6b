// src/models/mod.rs

//! Domain models for the catalog generator.
//!
//! This module contains the plain data structures shared by the bundle
//! readers and the output pipeline.

mod activity;
mod config;
mod feed_state;
mod index;
mod manifest;

// Re-export all public types
pub use activity::ActivityType;
pub use config::{
    BuildConfig, Config, ENV_AUTHORS_DIR, ENV_DOMAIN, ENV_GIT_URL_DIR, ENV_STATIC_DIR, FeedConfig,
    PathsConfig,
};
pub use feed_state::{FeedState, is_new_release};
pub use index::{CatalogIndex, FeedIndexEntry};
pub use manifest::{ACTIVITY_SECTION, BundleManifest, DEFAULT_ICON_NAME};
