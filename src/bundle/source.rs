// src/bundle/source.rs

//! Read-only access to bundle content.
//!
//! A bundle is either an unpacked source directory or a packaged `.xo`
//! archive. Both expose the same contract through [`BundleSource`]; the
//! storage mode is chosen once when the bundle is opened.
//!
//! ```text
//! Pippy.activity/              Pippy-5.xo
//! ├── activity/                └── Pippy.activity/
//! │   ├── activity.info            ├── activity/activity.info
//! │   └── activity-pippy.svg       ├── activity/activity-pippy.svg
//! ├── screenshots/*.png            ├── screenshots/*.png
//! ├── NEWS                         └── NEWS
//! └── dist/Pippy-5.xo
//! ```

use std::fmt;
use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::TempDir;
use walkdir::WalkDir;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{AppError, Result};

/// Manifest location relative to the bundle root.
pub const MANIFEST_PATH: &str = "activity/activity.info";

/// Screenshot directory relative to the bundle root.
pub const SCREENSHOTS_DIR: &str = "screenshots";

/// File extension of packaged bundles.
pub const ARCHIVE_EXTENSION: &str = "xo";

/// Upper bound on the buffer reserved up front for an archive entry.
const MAX_PREALLOC: u64 = 1 << 20;

/// How a bundle's content is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Directory,
    Archive,
}

/// A file available on disk for the lifetime of this value.
///
/// Files pulled out of an archive live in a temporary directory that is
/// removed when the value is dropped.
#[derive(Debug)]
pub struct Extracted {
    path: PathBuf,
    _scratch: Option<TempDir>,
}

impl Extracted {
    /// Wrap a path that already exists on disk.
    pub fn in_place(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _scratch: None,
        }
    }

    fn scratch(path: PathBuf, scratch: TempDir) -> Self {
        Self {
            path,
            _scratch: Some(scratch),
        }
    }

    /// Write `bytes` to a fresh temporary directory under `file_name`.
    pub fn from_bytes(file_name: &str, bytes: &[u8]) -> Result<Self> {
        let scratch = scratch_dir()?;
        let path = scratch.path().join(file_name);
        fs::write(&path, bytes)?;
        Ok(Self::scratch(path, scratch))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Screenshot files found in a bundle, kept alive with their scratch space.
#[derive(Debug, Default)]
pub struct Screenshots {
    paths: Vec<PathBuf>,
    _scratch: Option<TempDir>,
}

impl Screenshots {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }
}

/// Uniform read-only access to a bundle's files.
pub trait BundleSource: Send + Sync + fmt::Debug {
    /// Storage mode of this bundle.
    fn kind(&self) -> SourceKind;

    /// Directory or archive file backing the bundle.
    fn location(&self) -> &Path;

    /// Read a file relative to the bundle root. Missing files yield `None`.
    fn read(&self, relative: &str) -> Result<Option<Vec<u8>>>;

    /// Make a file relative to the bundle root available on disk.
    fn materialize(&self, relative: &str) -> Result<Option<Extracted>>;

    /// Collect every `*.png` below `screenshots/`, sorted by path.
    fn screenshots(&self) -> Result<Screenshots>;

    /// Read the manifest text, if present.
    fn manifest_text(&self) -> Result<Option<String>> {
        Ok(self
            .read(MANIFEST_PATH)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }
}

/// Bundle stored as an unpacked directory tree.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BundleSource for DirectorySource {
    fn kind(&self) -> SourceKind {
        SourceKind::Directory
    }

    fn location(&self) -> &Path {
        &self.root
    }

    fn read(&self, relative: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.root.join(relative)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn materialize(&self, relative: &str) -> Result<Option<Extracted>> {
        let path = self.root.join(relative);
        Ok(path.is_file().then(|| Extracted::in_place(path)))
    }

    fn screenshots(&self) -> Result<Screenshots> {
        Ok(Screenshots {
            paths: find_pngs(&self.root.join(SCREENSHOTS_DIR)),
            _scratch: None,
        })
    }
}

/// Bundle stored as a packaged `.xo` ZIP archive.
pub struct ArchiveSource {
    path: PathBuf,
    prefix: String,
    archive: Mutex<ZipArchive<File>>,
}

impl fmt::Debug for ArchiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveSource")
            .field("path", &self.path)
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl ArchiveSource {
    /// Open a packaged bundle. Fails if the file is not a readable ZIP.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        let archive = ZipArchive::new(file).map_err(|e| AppError::invalid_bundle(&path, e))?;
        let prefix = Self::prefix_for(&path);

        Ok(Self {
            path,
            prefix,
            archive: Mutex::new(archive),
        })
    }

    /// Top-level directory inside the archive: the file name with its
    /// trailing `-<version>` segment replaced by `.activity`.
    pub fn prefix_for(path: &Path) -> String {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = file_name
            .rsplit_once('-')
            .map(|(head, _)| head)
            .unwrap_or("");
        format!("{stem}.activity")
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn entry_name(&self, relative: &str) -> String {
        format!("{}/{}", self.prefix, relative)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ZipArchive<File>>> {
        self.archive
            .lock()
            .map_err(|_| AppError::invalid_bundle(&self.path, "archive handle poisoned"))
    }
}

impl BundleSource for ArchiveSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Archive
    }

    fn location(&self) -> &Path {
        &self.path
    }

    fn read(&self, relative: &str) -> Result<Option<Vec<u8>>> {
        let name = self.entry_name(relative);
        let mut archive = self.lock()?;
        let mut entry = match archive.by_name(&name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(AppError::Zip(e)),
        };
        let declared = entry.size();
        let mut bytes = Vec::with_capacity(declared.min(MAX_PREALLOC) as usize);
        (&mut entry).take(declared).read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }

    fn materialize(&self, relative: &str) -> Result<Option<Extracted>> {
        let Some(bytes) = self.read(relative)? else {
            return Ok(None);
        };
        let scratch = scratch_dir()?;
        let path = scratch.path().join(&self.prefix).join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        Ok(Some(Extracted::scratch(path, scratch)))
    }

    fn screenshots(&self) -> Result<Screenshots> {
        let wanted = Path::new(&self.prefix).join(SCREENSHOTS_DIR);
        let mut archive = self.lock()?;
        let mut scratch: Option<TempDir> = None;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let Some(name) = entry.enclosed_name() else {
                continue;
            };
            if !name.starts_with(&wanted) {
                continue;
            }

            let root = match &scratch {
                Some(dir) => dir.path().to_path_buf(),
                None => {
                    let dir = scratch_dir()?;
                    let root = dir.path().to_path_buf();
                    scratch = Some(dir);
                    root
                }
            };
            let target = root.join(&name);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            std::io::copy(&mut entry, &mut out)?;
        }

        let paths = scratch
            .as_ref()
            .map(|dir| find_pngs(&dir.path().join(&wanted)))
            .unwrap_or_default();
        Ok(Screenshots {
            paths,
            _scratch: scratch,
        })
    }
}

/// Open the right source for `path`: `.xo` files as archives, anything else
/// as a directory.
pub fn open_source(path: &Path) -> Result<Box<dyn BundleSource>> {
    if is_archive_path(path) {
        Ok(Box::new(ArchiveSource::open(path)?))
    } else {
        Ok(Box::new(DirectorySource::new(path)))
    }
}

/// Whether `path` names a packaged bundle.
pub fn is_archive_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == ARCHIVE_EXTENSION)
}

fn scratch_dir() -> Result<TempDir> {
    Ok(tempfile::Builder::new().prefix("bundlestore-").tempdir()?)
}

/// Recursively find `*.png` files, sorted for stable output.
fn find_pngs(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut found: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "png"))
        .map(|e| e.into_path())
        .collect();
    found.sort();
    found
}


#[cfg(test)]
mod tests {
    use super::test_support::write_zip;
    use super::*;

    #[test]
    fn test_prefix_strips_version_segment() {
        assert_eq!(
            ArchiveSource::prefix_for(Path::new("/b/Pippy-5.xo")),
            "Pippy.activity"
        );
        assert_eq!(
            ArchiveSource::prefix_for(Path::new("Turtle-Blocks-212.xo")),
            "Turtle-Blocks.activity"
        );
        assert_eq!(ArchiveSource::prefix_for(Path::new("Plain.xo")), ".activity");
    }

    #[test]
    fn test_archive_read_and_missing_entry() {
        let tmp = TempDir::new().unwrap();
        let xo = tmp.path().join("Pippy-5.xo");
        write_zip(
            &xo,
            &[("Pippy.activity/activity/activity.info", b"[Activity]\n")],
        );

        let source = ArchiveSource::open(&xo).unwrap();
        assert_eq!(source.kind(), SourceKind::Archive);
        assert_eq!(
            source.manifest_text().unwrap().as_deref(),
            Some("[Activity]\n")
        );
        assert!(source.read("NEWS").unwrap().is_none());
    }

    #[test]
    fn test_archive_reads_entry_larger_than_prealloc() {
        let tmp = TempDir::new().unwrap();
        let xo = tmp.path().join("Pippy-5.xo");
        let big = vec![7u8; (MAX_PREALLOC as usize) * 2 + 3];
        write_zip(
            &xo,
            &[
                ("Pippy.activity/activity/activity.info", b"[Activity]\n"),
                ("Pippy.activity/screenshots/big.png", big.as_slice()),
            ],
        );

        let source = ArchiveSource::open(&xo).unwrap();
        let bytes = source.read("screenshots/big.png").unwrap().unwrap();
        assert_eq!(bytes.len(), big.len());
        assert!(bytes.iter().all(|b| *b == 7));
    }

    #[test]
    fn test_archive_rejects_non_zip() {
        let tmp = TempDir::new().unwrap();
        let xo = tmp.path().join("Broken-1.xo");
        std::fs::write(&xo, b"not a zip").unwrap();

        assert!(matches!(
            ArchiveSource::open(&xo),
            Err(AppError::InvalidBundle { .. })
        ));
    }

    #[test]
    fn test_materialized_file_is_removed_on_drop() {
        let tmp = TempDir::new().unwrap();
        let xo = tmp.path().join("Pippy-5.xo");
        write_zip(
            &xo,
            &[("Pippy.activity/activity/icon.svg", b"<svg/>")],
        );

        let source = ArchiveSource::open(&xo).unwrap();
        let extracted = source.materialize("activity/icon.svg").unwrap().unwrap();
        let path = extracted.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"<svg/>");

        drop(extracted);
        assert!(!path.exists());
    }

    #[test]
    fn test_archive_screenshots() {
        let tmp = TempDir::new().unwrap();
        let xo = tmp.path().join("Pippy-5.xo");
        write_zip(
            &xo,
            &[
                ("Pippy.activity/screenshots/en/2.png", b"png2"),
                ("Pippy.activity/screenshots/1.png", b"png1"),
                ("Pippy.activity/screenshots/notes.txt", b"skip"),
                ("Pippy.activity/activity/other.png", b"skip"),
            ],
        );

        let source = ArchiveSource::open(&xo).unwrap();
        let shots = source.screenshots().unwrap();
        assert_eq!(shots.len(), 2);
        assert!(shots.paths()[0].ends_with("screenshots/1.png"));
        assert!(shots.paths()[1].ends_with("screenshots/en/2.png"));
    }

    #[test]
    fn test_directory_source() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("Pippy.activity");
        std::fs::create_dir_all(root.join("activity")).unwrap();
        std::fs::create_dir_all(root.join("screenshots")).unwrap();
        std::fs::write(root.join("activity/activity.info"), "[Activity]\n").unwrap();
        std::fs::write(root.join("screenshots/a.png"), b"png").unwrap();

        let source = DirectorySource::new(&root);
        assert!(source.manifest_text().unwrap().is_some());
        assert!(source.materialize("activity/missing.svg").unwrap().is_none());
        assert_eq!(source.screenshots().unwrap().len(), 1);
    }

    #[test]
    fn test_is_archive_path() {
        assert!(is_archive_path(Path::new("a/Pippy-5.xo")));
        assert!(!is_archive_path(Path::new("a/Pippy.activity")));
    }
}
