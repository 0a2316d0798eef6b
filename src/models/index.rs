//! Search index (`index.json`) records.
//!
//! The index holds at most one entry per `bundle_id`. Entries keep their
//! first-seen position; a repeated bundle replaces its entry in place.

use std::collections::HashMap;

use serde::{Deserialize, Serialize, Serializer};

use crate::models::ActivityType;

/// One search-index record per bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedIndexEntry {
    /// SHA-256 over `name + homepage_url`
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub license: Vec<String>,
    #[serde(rename = "url")]
    pub homepage_url: String,
    /// Icon file stem, or the bundle id under unique-icon mode
    pub icon_name: String,
    /// File name of the packaged artifact
    pub bundle_name: Option<String>,
    pub bundle_id: String,
    pub exec_type: Option<ActivityType>,
    #[serde(rename = "v")]
    pub version: Option<String>,
}

/// Ordered map from `bundle_id` to its index entry.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entries: Vec<FeedIndexEntry>,
    positions: HashMap<String, usize>,
}

impl CatalogIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry or replace the existing one for the same bundle.
    ///
    /// Returns `true` when an existing entry was replaced.
    pub fn upsert(&mut self, entry: FeedIndexEntry) -> bool {
        match self.positions.get(&entry.bundle_id) {
            Some(&pos) => {
                self.entries[pos] = entry;
                true
            }
            None => {
                self.positions
                    .insert(entry.bundle_id.clone(), self.entries.len());
                self.entries.push(entry);
                false
            }
        }
    }

    pub fn get(&self, bundle_id: &str) -> Option<&FeedIndexEntry> {
        self.positions.get(bundle_id).map(|&pos| &self.entries[pos])
    }

    pub fn entries(&self) -> &[FeedIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for CatalogIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}
