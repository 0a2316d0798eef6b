//! Local filesystem output tree.
//!
//! All state files are written atomically (temp file, then rename) so an
//! interrupted run never leaves a truncated `index.json` or `feed.json`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{CatalogIndex, FeedState};
use crate::services::{PageParams, PageRenderer};
use crate::storage::{CatalogStore, FEED_STATE_FILE, INDEX_FILE, OUTPUT_SUBDIRS};
use crate::utils::copy_dir_merge;

/// Static asset directories merged into the output root.
const STATIC_DIRS: [&str; 4] = ["css", "img", "favicon", "js"];

/// Static files copied to the output root when present.
const STATIC_FILES: [&str; 5] = [
    "browserconfig.xml",
    "manifest.json",
    "README.md",
    "LICENSE",
    "favicon.ico",
];

/// Site pages rendered from templates into the output root.
const STATIC_PAGES: [&str; 2] = ["about.html", "index.html"];

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    pub async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    pub async fn write_text(&self, key: &str, text: &str) -> Result<()> {
        self.write_bytes(key, text.as_bytes()).await
    }

    /// Write JSON data.
    pub async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    pub async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    pub async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Recreate the output subdirectories.
    ///
    /// An existing subdirectory is only removed when `force` is set or
    /// `confirm` approves it; a refusal aborts the run.
    pub async fn prepare_dirs(&self, force: bool, confirm: impl Fn(&Path) -> bool) -> Result<()> {
        tokio::fs::create_dir_all(&self.root_dir).await?;
        for sub in OUTPUT_SUBDIRS {
            let dir = self.path(sub);
            if tokio::fs::try_exists(&dir).await? {
                if !force && !confirm(&dir) {
                    return Err(AppError::Aborted(format!(
                        "refused to clear {}",
                        dir.display()
                    )));
                }
                log::debug!("Clearing {}", dir.display());
                tokio::fs::remove_dir_all(&dir).await?;
            }
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }

    /// Copy `src` to `<subdir>/<file_name>`, returning the site-relative path.
    pub async fn copy_into(&self, src: &Path, subdir: &str, file_name: &str) -> Result<String> {
        let key = format!("{subdir}/{file_name}");
        let target = self.path(&key);
        self.ensure_dir(&target).await?;
        tokio::fs::copy(src, &target).await?;
        Ok(format!("/{key}"))
    }

    /// Merge static assets from `static_dir` into the output root.
    ///
    /// Returns the number of files written.
    pub async fn copy_static_assets(
        &self,
        static_dir: &Path,
        renderer: &dyn PageRenderer,
    ) -> Result<usize> {
        tokio::fs::create_dir_all(&self.root_dir).await?;
        let mut written = 0;

        for dir in STATIC_DIRS {
            let src = static_dir.join(dir);
            if src.is_dir() {
                written += copy_dir_merge(&src, &self.path(dir))?;
            }
        }

        for file in STATIC_FILES {
            let src = static_dir.join(file);
            if src.is_file() {
                tokio::fs::copy(&src, self.path(file)).await?;
                written += 1;
            }
        }

        for page in STATIC_PAGES {
            if !renderer.has_template(page) {
                continue;
            }
            let html = renderer.render(page, &PageParams::new())?;
            self.write_text(page, &html).await?;
            written += 1;
        }

        log::info!("Copied {} static assets from {}", written, static_dir.display());
        Ok(written)
    }
}

#[async_trait]
impl CatalogStore for LocalStorage {
    async fn load_feed_state(&self) -> Result<Option<FeedState>> {
        self.read_json(FEED_STATE_FILE).await
    }

    async fn save_feed_state(&self, state: &FeedState) -> Result<()> {
        self.write_json(FEED_STATE_FILE, state).await
    }

    async fn save_index(&self, index: &CatalogIndex) -> Result<()> {
        self.write_json(INDEX_FILE, index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::TemplateRenderer;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write_bytes("api/test.xml", b"hello").await.unwrap();
        let data = storage.read_bytes("api/test.xml").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(!storage.path("api/test.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert!(storage.read_bytes("nope.txt").await.unwrap().is_none());
        assert!(storage.load_feed_state().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_feed_state_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let mut state = FeedState::default();
        state.observe("org.laptop.Pippy", "5");
        storage.save_feed_state(&state).await.unwrap();

        let loaded = storage.load_feed_state().await.unwrap().unwrap();
        assert_eq!(loaded.last_seen("org.laptop.Pippy"), Some("5"));
    }

    #[tokio::test]
    async fn test_prepare_dirs_requires_confirmation() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        std::fs::create_dir_all(tmp.path().join("api")).unwrap();
        std::fs::write(tmp.path().join("api/old.xml"), "old").unwrap();

        let refused = storage.prepare_dirs(false, |_| false).await;
        assert!(matches!(refused, Err(AppError::Aborted(_))));
        assert!(tmp.path().join("api/old.xml").exists());

        storage.prepare_dirs(false, |_| true).await.unwrap();
        assert!(!tmp.path().join("api/old.xml").exists());
        for sub in OUTPUT_SUBDIRS {
            assert!(tmp.path().join(sub).is_dir());
        }
    }

    #[tokio::test]
    async fn test_prepare_dirs_force_skips_prompt() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        std::fs::create_dir_all(tmp.path().join("icons")).unwrap();

        storage
            .prepare_dirs(true, |_| panic!("prompted despite force"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_copy_static_assets() {
        let tmp = TempDir::new().unwrap();
        let static_dir = tmp.path().join("static");
        std::fs::create_dir_all(static_dir.join("css")).unwrap();
        std::fs::create_dir_all(static_dir.join("templates")).unwrap();
        std::fs::write(static_dir.join("css/main.css"), "body{}").unwrap();
        std::fs::write(static_dir.join("LICENSE"), "AGPL").unwrap();
        std::fs::write(static_dir.join("templates/index.html"), "<h1>{{ title }}</h1>").unwrap();

        let out = tmp.path().join("out");
        let storage = LocalStorage::new(&out);
        let renderer = TemplateRenderer::new(Some(&static_dir));

        let written = storage
            .copy_static_assets(&static_dir, &renderer)
            .await
            .unwrap();
        assert_eq!(written, 3);
        assert!(out.join("css/main.css").is_file());
        assert_eq!(std::fs::read_to_string(out.join("index.html")).unwrap(), "<h1></h1>");
        assert!(!out.join("about.html").exists());
    }
}
