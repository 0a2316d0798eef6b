//! Filesystem helpers.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;

/// Locate `program` on `PATH`. Paths containing a separator are checked as-is.
pub fn find_executable(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|p| p.is_file())
}

/// Copy every file under `src` into `dst`, merging with existing content.
///
/// Returns the number of files copied.
pub fn copy_dir_merge(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src).into_iter().filter_map(|e| e.ok()) {
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// File name of `path` as an owned string.
pub fn file_name_string(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_merge_keeps_existing_files() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.join("a.css"), "a").unwrap();
        fs::write(src.join("nested/b.css"), "b").unwrap();
        fs::write(dst.join("keep.css"), "k").unwrap();

        assert_eq!(copy_dir_merge(&src, &dst).unwrap(), 2);
        assert!(dst.join("keep.css").exists());
        assert_eq!(fs::read_to_string(dst.join("nested/b.css")).unwrap(), "b");
    }

    #[test]
    fn test_find_executable() {
        assert!(find_executable("surely-not-a-real-program-name").is_none());
        assert!(find_executable("sh").is_some());
    }
}
