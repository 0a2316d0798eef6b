//! Output tree persistence.
//!
//! ## Directory Structure
//!
//! ```text
//! output/
//! ├── index.json            # Search index (array of entries)
//! ├── feed.json             # Last-seen version per bundle
//! ├── sitemap.xml
//! ├── app/                  # Detail pages + per-bundle screenshots
//! │   ├── org.laptop.Pippy.html
//! │   └── org.laptop.Pippy/1.png
//! ├── api/                  # Update-check documents
//! │   └── org.laptop.Pippy.xml
//! ├── bundles/              # Packaged artifacts
//! └── icons/                # Bundle icons
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CatalogIndex, FeedState};

pub use local::LocalStorage;

/// Search index file.
pub const INDEX_FILE: &str = "index.json";

/// Feed state file.
pub const FEED_STATE_FILE: &str = "feed.json";

/// Output subdirectories recreated by every generation run.
pub const OUTPUT_SUBDIRS: [&str; 4] = ["icons", "bundles", "app", "api"];

/// Persistence of the catalog-wide state files.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Load `feed.json`, if present.
    async fn load_feed_state(&self) -> Result<Option<FeedState>>;

    /// Write `feed.json`.
    async fn save_feed_state(&self, state: &FeedState) -> Result<()>;

    /// Write `index.json`.
    async fn save_index(&self, index: &CatalogIndex) -> Result<()>;
}
