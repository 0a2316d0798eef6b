//! Contributor and remote lookups.
//!
//! Source checkouts are queried through git; packaged bundles carry no
//! history, so their data comes from per-bundle override files named after
//! the bundle id.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{Commit, Oid, Repository, Sort};

use crate::error::{AppError, Result};
use crate::utils::normalize_remote_url;

/// Extension of per-bundle author log override files.
pub const AUTHORS_OVERRIDE_EXT: &str = "log";

/// Extension of per-bundle remote URL override files.
pub const GIT_URL_OVERRIDE_EXT: &str = "git";

/// Author name of every commit reachable from `HEAD`, newest first.
pub fn history_authors(dir: &Path) -> Result<Vec<String>> {
    let repo = open_repo(dir)?;
    let mut walk = repo.revwalk()?;
    walk.push_head()?;
    walk.set_sorting(Sort::TIME)?;

    let mut names = Vec::new();
    for oid in walk {
        let commit = repo.find_commit(oid?)?;
        if let Some(name) = commit.author().name() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// URL of the `origin` remote, with SSH GitHub remotes rewritten to HTTPS.
pub fn origin_url(dir: &Path) -> Result<Option<String>> {
    let repo = open_repo(dir)?;
    let remote = match repo.find_remote("origin") {
        Ok(remote) => remote,
        Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(remote.url().map(normalize_remote_url))
}

/// Read `<dir>/<bundle_id>.<ext>`, or `None` if it does not exist.
pub fn read_override(dir: &Path, bundle_id: &str, ext: &str) -> Result<Option<String>> {
    let path = dir.join(format!("{bundle_id}.{ext}"));
    match fs::read_to_string(&path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Load the newline-separated list of excluded author names.
pub fn load_bots(path: Option<&Path>) -> HashSet<String> {
    let Some(path) = path else {
        return HashSet::new();
    };
    match fs::read_to_string(path) {
        Ok(text) => text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect(),
        Err(e) => {
            log::warn!("Bots file {:?} unreadable: {}", path, e);
            HashSet::new()
        }
    }
}

/// Count commits per author, dropping blank names and excluded bots.
pub fn tally_authors<I, S>(names: I, bots: &HashSet<String>) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts = BTreeMap::new();
    for name in names {
        let name = name.as_ref().trim();
        if name.is_empty() || bots.contains(name) {
            continue;
        }
        *counts.entry(name.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Where `HEAD` pointed before a tag checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviousHead {
    Branch(String),
    Detached(Oid),
}

/// A checkout of a repository's newest tag. [`TagCheckout::restore`] moves
/// `HEAD` and the working tree back.
#[derive(Debug)]
pub struct TagCheckout {
    dir: PathBuf,
    tag: String,
    previous: PreviousHead,
}

impl TagCheckout {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn previous(&self) -> &PreviousHead {
        &self.previous
    }

    pub fn restore(self) -> Result<()> {
        let repo = Repository::open(&self.dir)?;
        let commit = match &self.previous {
            PreviousHead::Branch(refname) => repo.find_reference(refname)?.peel_to_commit()?,
            PreviousHead::Detached(oid) => repo.find_commit(*oid)?,
        };
        repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().safe()))?;
        match &self.previous {
            PreviousHead::Branch(refname) => repo.set_head(refname)?,
            PreviousHead::Detached(oid) => repo.set_head_detached(*oid)?,
        }
        Ok(())
    }
}

/// Check out the tag pointing at the most recently committed tagged commit
/// of the repository rooted at `dir`. `None` when the repository has no tags.
pub fn checkout_latest_tag(dir: &Path) -> Result<Option<TagCheckout>> {
    let repo = Repository::open(dir)
        .map_err(|e| AppError::VersionControl(format!("{}: {}", dir.display(), e.message())))?;
    let Some((tag, commit)) = latest_tag(&repo)? else {
        return Ok(None);
    };

    let head = repo.head()?;
    let previous = match head.name() {
        Some(name) if head.is_branch() => PreviousHead::Branch(name.to_string()),
        _ => PreviousHead::Detached(head.peel_to_commit()?.id()),
    };

    repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().safe()))?;
    repo.set_head_detached(commit.id())?;
    Ok(Some(TagCheckout {
        dir: dir.to_path_buf(),
        tag,
        previous,
    }))
}

fn latest_tag(repo: &Repository) -> Result<Option<(String, Commit<'_>)>> {
    let names = repo.tag_names(None)?;
    let mut latest: Option<(String, Commit<'_>)> = None;
    for name in names.iter().flatten() {
        let commit = match repo
            .revparse_single(&format!("refs/tags/{name}"))
            .and_then(|object| object.peel_to_commit())
        {
            Ok(commit) => commit,
            Err(e) => {
                log::debug!("[VCS] tag {} skipped: {}", name, e.message());
                continue;
            }
        };
        let newer = latest
            .as_ref()
            .is_none_or(|(_, current)| commit.time().seconds() >= current.time().seconds());
        if newer {
            latest = Some((name.to_string(), commit));
        }
    }
    Ok(latest)
}

fn open_repo(dir: &Path) -> Result<Repository> {
    Repository::discover(dir)
        .map_err(|e| AppError::VersionControl(format!("{}: {}", dir.display(), e.message())))
}
