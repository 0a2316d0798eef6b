// src/bundle/mod.rs

//! The per-bundle runtime entity.
//!
//! A [`Bundle`] pairs a [`BundleSource`] with its parsed manifest and the
//! packaged artifact resolved for it. Lifecycle within one run:
//!
//! ```text
//! Discovered ──▶ Invalid (skipped)
//!     │
//!     ▼
//!   Unbuilt ──generate_build──▶ Built ──generate──▶ Indexed
//! ```

mod build;
pub mod news;
pub mod source;
pub mod vcs;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::{ActivityType, BundleManifest, FeedIndexEntry, PathsConfig};
use crate::utils::{file_name_string, sha256_hex};

pub use build::{ALREADY_BUILT, INSTALL_BUNDLE_PROGRAM};
pub use source::{
    ArchiveSource, BundleSource, DirectorySource, Extracted, MANIFEST_PATH, Screenshots,
    SourceKind, is_archive_path, open_source,
};

/// Directory holding built artifacts inside a source checkout.
pub const DIST_DIR: &str = "dist";

/// Icon written when neither the bundle nor the configuration supplies one.
pub const PLACEHOLDER_ICON_SVG: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="55" height="55" viewBox="0 0 55 55">
<rect x="4" y="4" width="47" height="47" rx="6" fill="#ffffff" stroke="#282828" stroke-width="3.5"/>
<circle cx="27.5" cy="27.5" r="9" fill="none" stroke="#282828" stroke-width="3.5"/>
</svg>
"##;

/// A discovered bundle and its manifest.
#[derive(Debug)]
pub struct Bundle {
    source: Box<dyn BundleSource>,
    manifest: BundleManifest,
    artifact: Option<PathBuf>,
}

impl Bundle {
    /// Open the bundle at `path` and parse its manifest.
    ///
    /// Archives without a manifest entry are rejected as invalid; a directory
    /// without one parses as empty text and fails manifest validation.
    pub fn open(path: &Path) -> Result<Self> {
        let source = open_source(path)?;
        let text = match source.manifest_text()? {
            Some(text) => text,
            None if source.kind() == SourceKind::Archive => {
                return Err(AppError::invalid_bundle(
                    path,
                    format!("missing {MANIFEST_PATH}"),
                ));
            }
            None => String::new(),
        };
        let manifest = BundleManifest::parse(&text)?;
        Ok(Self::from_parts(source, manifest))
    }

    /// Assemble a bundle from an already opened source.
    pub fn from_parts(source: Box<dyn BundleSource>, manifest: BundleManifest) -> Self {
        let mut bundle = Self {
            source,
            manifest,
            artifact: None,
        };
        bundle.refresh_artifact();
        bundle
    }

    pub fn manifest(&self) -> &BundleManifest {
        &self.manifest
    }

    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }

    pub fn is_archive(&self) -> bool {
        self.kind() == SourceKind::Archive
    }

    /// Directory or archive file backing this bundle.
    pub fn path(&self) -> &Path {
        self.source.location()
    }

    pub fn name(&self) -> Option<&str> {
        self.manifest.name.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.manifest.version.as_deref()
    }

    pub fn bundle_id(&self) -> &str {
        &self.manifest.bundle_id
    }

    pub fn tags(&self) -> &[String] {
        &self.manifest.tags
    }

    pub fn license(&self) -> &[String] {
        &self.manifest.license
    }

    pub fn summary(&self) -> Option<&str> {
        self.manifest.summary.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.manifest.description.as_deref()
    }

    pub fn homepage_url(&self) -> &str {
        &self.manifest.homepage_url
    }

    pub fn icon_name(&self) -> &str {
        &self.manifest.icon_name
    }

    /// Runtime family of the activity, if it declares an `exec` command.
    pub fn activity_type(&self) -> Option<ActivityType> {
        ActivityType::classify(self.manifest.exec_command.as_deref())
    }

    /// Short label used in log lines.
    pub fn label(&self) -> &str {
        self.name().unwrap_or_else(|| self.bundle_id())
    }

    /// The packaged artifact, if one has been resolved.
    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    /// Re-resolve the packaged artifact.
    ///
    /// A packaged bundle is its own artifact. For a source checkout this is
    /// the lexicographically greatest file name under `dist/`.
    pub fn refresh_artifact(&mut self) -> Option<&Path> {
        self.artifact = if self.is_archive() {
            Some(self.path().to_path_buf())
        } else {
            latest_in_dist(&self.path().join(DIST_DIR))
        };
        self.artifact.as_deref()
    }

    /// The bundle's SVG icon, or `placeholder` when it ships none.
    pub fn icon(&self, placeholder: &Path) -> Result<Extracted> {
        let relative = format!("activity/{}.svg", self.manifest.icon_name);
        match self.source.materialize(&relative)? {
            Some(icon) => Ok(icon),
            None => {
                log::debug!("[ICON][{}] {} missing, using placeholder", self.label(), relative);
                Ok(Extracted::in_place(placeholder))
            }
        }
    }

    /// Screenshots shipped with the bundle.
    pub fn screenshots(&self) -> Result<Screenshots> {
        self.source.screenshots()
    }

    /// Full text of the bundle's NEWS file.
    pub fn changelog_text(&self) -> Result<Option<String>> {
        Ok(self
            .source
            .read(news::NEWS_PATH)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Notes for the current version, taken from NEWS.
    pub fn latest_release_notes(&self) -> Result<Option<String>> {
        Ok(self
            .changelog_text()?
            .and_then(|news| news::latest_release_notes(&news, self.version())))
    }

    /// Commit count per contributor.
    ///
    /// Source checkouts use their git history. Packaged bundles read
    /// `<authors_dir>/<bundle_id>.log`, one author name per line. Lookup
    /// failures degrade to an empty map.
    pub fn authors(&self, paths: &PathsConfig, bots: &HashSet<String>) -> BTreeMap<String, usize> {
        let names = if self.is_archive() {
            let Some(dir) = paths.authors_dir.as_deref() else {
                return BTreeMap::new();
            };
            vcs::read_override(dir, self.bundle_id(), vcs::AUTHORS_OVERRIDE_EXT)
                .map(|text| {
                    text.unwrap_or_default()
                        .lines()
                        .map(String::from)
                        .collect::<Vec<_>>()
                })
        } else {
            vcs::history_authors(self.path())
        };

        match names {
            Ok(names) => vcs::tally_authors(names, bots),
            Err(e) => {
                log::debug!("[VCS][{}] authors unavailable: {}", self.label(), e);
                BTreeMap::new()
            }
        }
    }

    /// Repository URL of the bundle's source.
    ///
    /// Source checkouts report their `origin` remote; packaged bundles read
    /// `<git_url_dir>/<bundle_id>.git`. A trailing `.git` is kept.
    pub fn repository_source_url(&self, git_url_dir: Option<&Path>) -> Option<String> {
        let url = if self.is_archive() {
            let dir = git_url_dir?;
            vcs::read_override(dir, self.bundle_id(), vcs::GIT_URL_OVERRIDE_EXT)
                .map(|text| text.map(|t| t.trim().to_string()))
        } else {
            vcs::origin_url(self.path())
        };

        match url {
            Ok(url) => url.filter(|u| !u.is_empty()),
            Err(e) => {
                log::debug!("[VCS][{}] remote unavailable: {}", self.label(), e);
                None
            }
        }
    }

    /// Search-index record for this bundle.
    ///
    /// `id` is the SHA-256 of name followed by homepage URL; a bundle
    /// without a name cannot be fingerprinted.
    pub fn fingerprint_record(&self, unique_icons: bool) -> Result<FeedIndexEntry> {
        let name = self.name().ok_or_else(|| {
            AppError::validation(format!("{}: manifest has no name", self.bundle_id()))
        })?;

        Ok(FeedIndexEntry {
            id: sha256_hex(&format!("{}{}", name, self.homepage_url())),
            name: name.to_string(),
            tags: self.manifest.tags.clone(),
            summary: self.manifest.summary.clone(),
            license: self.manifest.license.clone(),
            homepage_url: self.manifest.homepage_url.clone(),
            icon_name: if unique_icons {
                self.bundle_id().to_string()
            } else {
                self.manifest.icon_name.clone()
            },
            bundle_name: self.artifact.as_deref().and_then(file_name_string),
            bundle_id: self.bundle_id().to_string(),
            exec_type: self.activity_type(),
            version: self.manifest.version.clone(),
        })
    }
}

/// Icon to use for bundles that ship none.
///
/// A configured file is used in place; otherwise the built-in SVG is
/// written to a temporary file.
pub fn placeholder_icon(configured: Option<&Path>) -> Result<Extracted> {
    match configured {
        Some(path) if path.is_file() => Ok(Extracted::in_place(path)),
        Some(path) => {
            log::warn!("Placeholder icon {:?} not found, using built-in icon", path);
            Extracted::from_bytes("activity-helloworld.svg", PLACEHOLDER_ICON_SVG.as_bytes())
        }
        None => Extracted::from_bytes("activity-helloworld.svg", PLACEHOLDER_ICON_SVG.as_bytes()),
    }
}

/// Greatest file name in `dist`, if any.
fn latest_in_dist(dist: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(dist).ok()?;
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .max_by(|a, b| a.file_name().cmp(&b.file_name()))
}
