// src/pipeline/generate.rs

//! Catalog generation: detail pages, update feeds, search index and
//! release tracking.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::bundle::{Bundle, placeholder_icon, vcs};
use crate::error::{AppError, Result};
use crate::models::{CatalogIndex, Config, FeedIndexEntry, FeedState};
use crate::services::{DETAIL_TEMPLATE, PageParams, PageRenderer, Release, ReleaseNotifier};
use crate::storage::{CatalogStore, LocalStorage};
use crate::utils::{file_name_string, strip_git_suffix};

use super::fragments::{self, FlatpakRegistry};
use super::progress::ProgressDisplay;
use super::update_feed::UpdateFeedDocument;

/// Outcome counts of a generation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    pub published: usize,
    /// Bundles without a packaged artifact
    pub skipped: usize,
    pub failed: usize,
    pub new_releases: usize,
}

impl fmt::Display for GenerateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} published, {} skipped, {} failed, {} new releases",
            self.published, self.skipped, self.failed, self.new_releases
        )
    }
}

/// A bundle whose pages and feed were written.
struct Published {
    entry: FeedIndexEntry,
    notes: Option<String>,
}

/// Writes the catalog for a set of bundles into one output tree.
pub struct FeedGenerator<'a> {
    config: &'a Config,
    storage: LocalStorage,
    renderer: &'a dyn PageRenderer,
    notifier: &'a dyn ReleaseNotifier,
    flatpaks: FlatpakRegistry,
    bots: HashSet<String>,
}

impl<'a> FeedGenerator<'a> {
    pub fn new(
        config: &'a Config,
        renderer: &'a dyn PageRenderer,
        notifier: &'a dyn ReleaseNotifier,
    ) -> Result<Self> {
        let flatpaks = match (&config.paths.flatpak_registry, config.feed.include_flatpaks) {
            (Some(path), true) => FlatpakRegistry::load(path).map_err(|e| {
                AppError::config(format!("flatpak registry {:?}: {}", path, e))
            })?,
            _ => FlatpakRegistry::default(),
        };

        Ok(Self {
            config,
            storage: LocalStorage::new(&config.paths.output),
            renderer,
            notifier,
            flatpaks,
            bots: vcs::load_bots(config.paths.bots_file.as_deref()),
        })
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// Generate the catalog for `bundles`.
    ///
    /// Existing output subdirectories are cleared after `force` or `confirm`
    /// allows it. Per-bundle failures are logged and counted; only fatal
    /// errors abort the run.
    pub async fn generate(
        &self,
        bundles: &[Bundle],
        force: bool,
        confirm: impl Fn(&Path) -> bool,
        progress: &ProgressDisplay,
    ) -> Result<GenerateSummary> {
        self.storage.prepare_dirs(force, confirm).await?;

        let mut state = match self.storage.load_feed_state().await? {
            Some(state) => state,
            None => {
                let state = FeedState::default();
                self.storage.save_feed_state(&state).await?;
                state
            }
        };

        let placeholder = placeholder_icon(self.config.paths.placeholder_icon.as_deref())?;
        let mut index = CatalogIndex::new();
        let mut summary = GenerateSummary::default();

        for bundle in bundles {
            progress.start(bundle.label());
            match self.publish(bundle, placeholder.path()).await {
                Ok(Some(published)) => {
                    if index.upsert(published.entry) {
                        log::warn!("[STATIC][{}] duplicate bundle id replaced", bundle.bundle_id());
                    }
                    summary.published += 1;
                    if self.track_release(bundle, &mut state, published.notes).await {
                        summary.new_releases += 1;
                    }
                }
                Ok(None) => summary.skipped += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::error!("[STATIC][{}] {}", bundle.label(), e);
                    summary.failed += 1;
                }
            }
            progress.inc();
        }
        progress.finish();

        self.storage.save_index(&index).await?;
        state.touch();
        self.storage.save_feed_state(&state).await?;

        if let Some(static_dir) = &self.config.paths.static_dir {
            self.storage
                .copy_static_assets(static_dir, self.renderer)
                .await?;
        }

        log::info!("Generation finished: {}", summary);
        Ok(summary)
    }

    /// Write every per-bundle output. Returns `None` for unbuilt bundles.
    async fn publish(&self, bundle: &Bundle, placeholder: &Path) -> Result<Option<Published>> {
        let feed = &self.config.feed;
        let label = bundle.label();
        let id = bundle.bundle_id();

        let Some(artifact) = bundle.artifact_path() else {
            log::warn!(
                "[STATIC][{}] {}, skipping",
                label,
                AppError::MissingArtifact(id.to_string())
            );
            return Ok(None);
        };
        let artifact_name = file_name_string(artifact)
            .ok_or_else(|| AppError::MissingArtifact(id.to_string()))?;

        // Fails for nameless bundles before anything is written.
        let entry = bundle.fingerprint_record(feed.unique_icons)?;
        let name = entry.name.clone();

        log::debug!("[STATIC][{}] Processing fragments", label);
        let notes = bundle.latest_release_notes()?;
        let changelog = bundle.changelog_text()?;
        let authors = bundle.authors(&self.config.paths, &self.bots);

        let carousel = if feed.include_screenshots {
            let screenshots = bundle.screenshots()?;
            if screenshots.is_empty() {
                String::new()
            } else {
                fragments::carousel_html(self.storage.root(), id, &name, screenshots.paths())?
            }
        } else {
            String::new()
        };

        let git_url = bundle.repository_source_url(self.config.paths.git_url_dir.as_deref());
        let flatpak = match (&git_url, feed.include_flatpaks) {
            (Some(url), true) => self
                .flatpaks
                .lookup(strip_git_suffix(url))
                .map(|entry| fragments::flatpak_html(&name, &entry.bundle_id))
                .unwrap_or_default(),
            _ => String::new(),
        };

        log::debug!("[STATIC][{}] Copying artifact and icon", label);
        let bundle_path = self
            .storage
            .copy_into(artifact, "bundles", &artifact_name)
            .await?;
        let icon = bundle.icon(placeholder)?;
        let icon_file = if feed.unique_icons {
            format!("{id}.svg")
        } else {
            format!("{}.svg", bundle.icon_name())
        };
        let icon_path = self.storage.copy_into(icon.path(), "icons", &icon_file).await?;

        let params: PageParams = [
            ("title", name.clone()),
            ("version", bundle.version().unwrap_or_default().to_string()),
            ("summary", bundle.summary().unwrap_or_default().to_string()),
            ("description", bundle.description().unwrap_or_default().to_string()),
            ("licenses", fragments::licenses_html(bundle.license())),
            ("bundle_path", bundle_path),
            ("icon_path", icon_path),
            ("tag_list_html_formatted", fragments::tags_html(bundle.tags())),
            ("author_list_html_formatted", fragments::authors_html(&authors)),
            ("new_feature_html_div", fragments::new_feature_html(notes.as_deref())),
            ("changelog_html_div", fragments::changelog_html(changelog.as_deref())),
            ("git_url", git_url.unwrap_or_default()),
            ("flatpak_html_div", flatpak),
            ("carousel", carousel),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        log::debug!("[STATIC][{}] Writing detail page", label);
        let html = self.renderer.render(DETAIL_TEMPLATE, &params)?;
        self.storage.write_text(&format!("app/{id}.html"), &html).await?;

        log::debug!("[STATIC][{}] Writing update feed", label);
        let document = UpdateFeedDocument::for_artifact(id, bundle.version(), artifact, feed)?;
        self.storage
            .write_text(&format!("api/{id}.xml"), &document.render())
            .await?;

        log::info!("[STATIC][{}] published {}", label, artifact_name);
        Ok(Some(Published { entry, notes }))
    }

    /// Record the bundle's version and notify on a new release.
    async fn track_release(
        &self,
        bundle: &Bundle,
        state: &mut FeedState,
        notes: Option<String>,
    ) -> bool {
        let Some(version) = bundle.version() else {
            return false;
        };
        if !state.observe(bundle.bundle_id(), version) {
            return false;
        }

        let release = Release {
            bundle_id: bundle.bundle_id().to_string(),
            name: bundle.label().to_string(),
            version: version.to_string(),
            notes,
        };
        if let Err(e) = self.notifier.notify(&release).await {
            log::warn!("[RELEASE][{}] notification failed: {}", bundle.label(), e);
        }
        true
    }
}
