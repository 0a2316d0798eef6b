//! Utility functions and helpers.

pub mod fs;
pub mod hash;

pub use fs::{copy_dir_merge, file_name_string, find_executable};
pub use hash::{HASH_CHUNK_SIZE, sha256_file, sha256_hex};

/// Rewrite an SSH GitHub remote into its HTTPS form.
pub fn normalize_remote_url(url: &str) -> String {
    url.trim().replace("git@github.com:", "https://github.com/")
}

/// Strip a trailing `.git` from a repository URL.
pub fn strip_git_suffix(url: &str) -> &str {
    url.strip_suffix(".git").unwrap_or(url)
}
