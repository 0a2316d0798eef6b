// src/pipeline/discover.rs

//! Bundle discovery.

use std::fs;
use std::path::Path;

use crate::bundle::{Bundle, MANIFEST_PATH, is_archive_path};
use crate::error::{AppError, Result};

/// Open every bundle directly under `root`.
///
/// Children are visited in reverse name order. Directories qualify when they
/// contain a manifest; `.xo` files when they open as archives with a valid
/// manifest. Anything else is dropped and logged at debug level.
pub fn scan(root: &Path) -> Result<Vec<Bundle>> {
    let mut children: Vec<_> = fs::read_dir(root)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    children.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    let mut bundles = Vec::new();
    for path in children {
        let candidate = if path.is_dir() {
            path.join(MANIFEST_PATH).is_file()
        } else {
            path.is_file() && is_archive_path(&path)
        };
        if !candidate {
            continue;
        }

        match Bundle::open(&path) {
            Ok(bundle) => {
                log::debug!("[DISCOVER] {} ({})", bundle.bundle_id(), path.display());
                bundles.push(bundle);
            }
            Err(e) => log::debug!("[DISCOVER] skipping {}: {}", path.display(), e),
        }
    }

    log::info!("Discovered {} bundles in {}", bundles.len(), root.display());
    Ok(bundles)
}

/// [`scan`], failing when nothing was found.
pub fn scan_required(root: &Path) -> Result<Vec<Bundle>> {
    let bundles = scan(root)?;
    if bundles.is_empty() {
        return Err(AppError::NoBundlesFound(root.display().to_string()));
    }
    Ok(bundles)
}
