//! Persisted last-known-version table (`feed.json`).

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Last-seen version per bundle plus the time of the last generation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedState {
    /// UNIX timestamp (seconds, fractional)
    pub generated: f64,
    #[serde(default)]
    pub bundles: BTreeMap<String, String>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            generated: now_timestamp(),
            bundles: BTreeMap::new(),
        }
    }
}

impl FeedState {
    /// Record `version` for `bundle_id` if it is a new release.
    ///
    /// Returns `true` when the version was recorded.
    pub fn observe(&mut self, bundle_id: &str, version: &str) -> bool {
        let saved = self.bundles.get(bundle_id).map(String::as_str);
        if !is_new_release(saved, version) {
            return false;
        }
        self.bundles
            .insert(bundle_id.to_string(), version.to_string());
        true
    }

    pub fn last_seen(&self, bundle_id: &str) -> Option<&str> {
        self.bundles.get(bundle_id).map(String::as_str)
    }

    /// Refresh the generation timestamp.
    pub fn touch(&mut self) {
        self.generated = now_timestamp();
    }
}

/// Decide whether `current` is a new release relative to `saved`.
///
/// An unknown bundle compares against `"0"`. When both sides parse as
/// numbers only an increase counts; otherwise any difference does.
pub fn is_new_release(saved: Option<&str>, current: &str) -> bool {
    let saved = saved.unwrap_or("0");
    match (saved.trim().parse::<f64>(), current.trim().parse::<f64>()) {
        (Ok(prev), Ok(next)) => prev < next,
        _ => saved != current,
    }
}

fn now_timestamp() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_versions() {
        assert!(is_new_release(None, "5"));
        assert!(is_new_release(Some("5"), "6"));
        assert!(!is_new_release(Some("6"), "6"));
        assert!(!is_new_release(Some("6"), "5"));
        assert!(is_new_release(Some("5"), "5.1"));
    }

    #[test]
    fn test_non_numeric_versions_fall_back_to_inequality() {
        assert!(is_new_release(Some("1.2.3"), "1.2.4"));
        assert!(is_new_release(Some("1.2.4"), "1.2.3"));
        assert!(!is_new_release(Some("v2-beta"), "v2-beta"));
        assert!(is_new_release(None, "v1"));
    }

    #[test]
    fn test_observe_records_transition() {
        let mut state = FeedState::default();
        assert!(state.observe("org.laptop.Pippy", "5"));
        assert!(!state.observe("org.laptop.Pippy", "5"));
        assert!(state.observe("org.laptop.Pippy", "6"));
        assert_eq!(state.last_seen("org.laptop.Pippy"), Some("6"));
    }

    #[test]
    fn test_deserializes_without_bundles() {
        let state: FeedState = serde_json::from_str(r#"{"generated": 1.5}"#).unwrap();
        assert!(state.bundles.is_empty());
        assert_eq!(state.generated, 1.5);
    }
}
