//! Pipeline entry points for catalog operations.
//!
//! - `scan`: Discover bundles under an input directory
//! - `build_all`: Package source bundles into `.xo` artifacts
//! - `install_all`: Install bundles for the user or system-wide
//! - `FeedGenerator`: Publish pages, update feeds and the search index
//! - `generate_sitemap`: Write `sitemap.xml` for the published pages

pub mod build;
pub mod discover;
pub mod fragments;
pub mod generate;
pub mod progress;
pub mod sitemap;
pub mod update_feed;

pub use build::{BuildSummary, build_all, install_all};
pub use discover::{scan, scan_required};
pub use generate::{FeedGenerator, GenerateSummary};
pub use progress::ProgressDisplay;
pub use sitemap::generate_sitemap;
pub use update_feed::UpdateFeedDocument;
