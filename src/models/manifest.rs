//! Bundle manifest (`activity/activity.info`) parsing.
//!
//! The manifest is INI-style text. Only the `[Activity]` section is read;
//! keys are case-insensitive, values may be separated by `=` or `:` and may
//! continue on indented lines.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Section that every manifest must carry.
pub const ACTIVITY_SECTION: &str = "Activity";

/// Icon used when the manifest does not name one.
pub const DEFAULT_ICON_NAME: &str = "activity-helloworld";

/// Normalized record read from a bundle manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub bundle_id: String,
    pub icon_name: String,
    pub exec_command: Option<String>,
    /// License tokens split on `;`. An unset license yields `[""]`.
    pub license: Vec<String>,
    pub repository_url: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub homepage_url: String,
    pub tags: Vec<String>,
    pub screenshot_refs: Vec<String>,
}

impl BundleManifest {
    /// Parse manifest text into a record.
    ///
    /// Fails when the `[Activity]` section is missing or `bundle_id` is empty.
    pub fn parse(raw: &str) -> Result<Self> {
        let sections = parse_sections(raw)?;
        let section = sections
            .get(ACTIVITY_SECTION)
            .ok_or_else(|| AppError::manifest("no Activity section"))?;

        let get = |key: &str| section.get(key).cloned();

        let bundle_id = get("bundle_id").unwrap_or_default();
        if bundle_id.trim().is_empty() {
            return Err(AppError::manifest("bundle_id is missing or empty"));
        }

        // Only the `tags` key is read.
        let tags = split_tokens(&get("tags").unwrap_or_default());

        Ok(Self {
            name: get("name"),
            version: get("activity_version").or_else(|| get("activity-version")),
            bundle_id,
            icon_name: get("icon").unwrap_or_else(|| DEFAULT_ICON_NAME.to_string()),
            exec_command: get("exec"),
            license: split_tokens(&get("license").unwrap_or_default()),
            repository_url: get("repository"),
            summary: get("summary"),
            description: get("description"),
            homepage_url: get("url").unwrap_or_default(),
            tags,
            screenshot_refs: get("screenshots")
                .map(|s| s.split_whitespace().map(String::from).collect())
                .unwrap_or_default(),
        })
    }
}

/// Split a `;`-separated manifest value. Empty input yields a single empty token.
fn split_tokens(value: &str) -> Vec<String> {
    value.split(';').map(String::from).collect()
}

type Section = HashMap<String, String>;

/// Parse INI text into `section -> (lowercased key -> value)`.
fn parse_sections(raw: &str) -> Result<HashMap<String, Section>> {
    let mut sections: HashMap<String, Section> = HashMap::new();
    let mut current: Option<String> = None;
    let mut open_key: Option<String> = None;
    let mut pending_blank = 0usize;

    for (line_no, line) in raw.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if open_key.is_some() {
                pending_blank += 1;
            }
            continue;
        }
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let indented = line.starts_with(char::is_whitespace);
        if indented {
            if let (Some(section), Some(key)) = (&current, &open_key) {
                if let Some(value) = sections.get_mut(section).and_then(|s| s.get_mut(key)) {
                    for _ in 0..pending_blank {
                        value.push('\n');
                    }
                    if !value.is_empty() {
                        value.push('\n');
                    }
                    value.push_str(trimmed);
                }
                pending_blank = 0;
                continue;
            }
        }
        pending_blank = 0;

        if trimmed.starts_with('[') {
            let name = trimmed
                .strip_prefix('[')
                .and_then(|s| s.strip_suffix(']'))
                .ok_or_else(|| {
                    AppError::manifest(format!("malformed section header on line {}", line_no + 1))
                })?;
            sections.entry(name.to_string()).or_default();
            current = Some(name.to_string());
            open_key = None;
            continue;
        }

        let Some(section) = &current else {
            return Err(AppError::manifest(format!(
                "key outside of any section on line {}",
                line_no + 1
            )));
        };

        let split_at = trimmed.find(['=', ':']).ok_or_else(|| {
            AppError::manifest(format!("expected `key = value` on line {}", line_no + 1))
        })?;
        let key = trimmed[..split_at].trim().to_lowercase();
        let value = trimmed[split_at + 1..].trim().to_string();

        sections
            .entry(section.clone())
            .or_default()
            .insert(key.clone(), value);
        open_key = Some(key);
    }

    Ok(sections)
}
