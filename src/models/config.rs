//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Environment variable overriding `feed.domain`.
pub const ENV_DOMAIN: &str = "BUNDLESTORE_DOMAIN";
/// Environment variable overriding `paths.authors_dir`.
pub const ENV_AUTHORS_DIR: &str = "BUNDLESTORE_AUTHORS_DIR";
/// Environment variable overriding `paths.git_url_dir`.
pub const ENV_GIT_URL_DIR: &str = "BUNDLESTORE_GIT_URL_DIR";
/// Environment variable overriding `paths.static_dir`.
pub const ENV_STATIC_DIR: &str = "BUNDLESTORE_STATIC_DIR";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input, output and auxiliary data locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// External build step settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Published feed settings
    #[serde(default)]
    pub feed: FeedConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from `path`, or defaults when the file is absent.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_if_exists(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Overlay values supplied through the environment.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(domain) = non_empty(ENV_DOMAIN) {
            self.feed.domain = domain;
        }
        if let Some(dir) = non_empty(ENV_AUTHORS_DIR) {
            self.paths.authors_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = non_empty(ENV_GIT_URL_DIR) {
            self.paths.git_url_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = non_empty(ENV_STATIC_DIR) {
            self.paths.static_dir = Some(PathBuf::from(dir));
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let domain = Url::parse(&self.feed.domain)
            .map_err(|e| AppError::config(format!("feed.domain is not a URL: {e}")))?;
        if domain.cannot_be_a_base() {
            return Err(AppError::config("feed.domain must be an absolute URL"));
        }
        if self.build.timeout_secs == 0 {
            return Err(AppError::config("build.timeout_secs must be > 0"));
        }
        if self.feed.min_version.trim().is_empty() || self.feed.max_version.trim().is_empty() {
            return Err(AppError::config(
                "feed.min_version and feed.max_version must be set",
            ));
        }
        if self.build.override_default && self.build.entrypoint.is_none() {
            return Err(AppError::config(
                "build.override_default requires build.entrypoint",
            ));
        }
        Ok(())
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory scanned for bundles
    #[serde(default = "defaults::input")]
    pub input: PathBuf,

    /// Root of the generated site
    #[serde(default = "defaults::output")]
    pub output: PathBuf,

    /// Static asset source (`templates/`, `css/`, `js/`, ...)
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// JSON map from repository URL to flatpak registration
    #[serde(default)]
    pub flatpak_registry: Option<PathBuf>,

    /// Icon used when a bundle ships none
    #[serde(default)]
    pub placeholder_icon: Option<PathBuf>,

    /// Newline-separated author names excluded from author lists
    #[serde(default)]
    pub bots_file: Option<PathBuf>,

    /// Directory of `<bundle_id>.log` author logs for packaged bundles
    #[serde(default)]
    pub authors_dir: Option<PathBuf>,

    /// Directory of `<bundle_id>.git` remote URLs for packaged bundles
    #[serde(default)]
    pub git_url_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: defaults::input(),
            output: defaults::output(),
            static_dir: None,
            flatpak_registry: None,
            placeholder_icon: None,
            bots_file: None,
            authors_dir: None,
            git_url_dir: None,
        }
    }
}

/// External build step settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Base wait for a build child process
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Wait a second time (twice as long) before giving up
    #[serde(default = "defaults::retry")]
    pub retry: bool,

    /// Interpreter for python3 and web activities
    #[serde(default = "defaults::python3")]
    pub python3: String,

    /// Interpreter for legacy python2 activities
    #[serde(default = "defaults::python2")]
    pub python2: String,

    /// Script run before (or instead of) the default build step
    #[serde(default)]
    pub entrypoint: Option<PathBuf>,

    /// Run only the entrypoint script, skipping the default build step
    #[serde(default)]
    pub override_default: bool,

    /// Run the entrypoint script inside the bundle directory
    #[serde(default)]
    pub chdir: bool,

    /// Build source checkouts from their newest git tag
    #[serde(default)]
    pub checkout_latest_tag: bool,
}

impl BuildConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::timeout(),
            retry: defaults::retry(),
            python3: defaults::python3(),
            python2: defaults::python2(),
            entrypoint: None,
            override_default: false,
            chdir: false,
            checkout_latest_tag: false,
        }
    }
}

/// Published feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Public base URL of the generated site
    #[serde(default = "defaults::domain")]
    pub domain: String,

    /// Lowest compatible host version advertised in update feeds
    #[serde(default = "defaults::min_version")]
    pub min_version: String,

    /// Highest compatible host version advertised in update feeds
    #[serde(default = "defaults::max_version")]
    pub max_version: String,

    /// Name copied icons after the bundle id
    #[serde(default)]
    pub unique_icons: bool,

    /// Render a screenshot carousel on detail pages
    #[serde(default)]
    pub include_screenshots: bool,

    /// Render a flatpak card when the repository is registered
    #[serde(default)]
    pub include_flatpaks: bool,
}

impl FeedConfig {
    /// Domain without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.domain.trim_end_matches('/')
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            domain: defaults::domain(),
            min_version: defaults::min_version(),
            max_version: defaults::max_version(),
            unique_icons: false,
            include_screenshots: false,
            include_flatpaks: false,
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn input() -> PathBuf {
        PathBuf::from(".")
    }
    pub fn output() -> PathBuf {
        PathBuf::from("catalog-out")
    }

    // Build defaults
    pub fn timeout() -> u64 {
        120
    }
    pub fn retry() -> bool {
        true
    }
    pub fn python3() -> String {
        "python3".into()
    }
    pub fn python2() -> String {
        "python2".into()
    }

    // Feed defaults
    pub fn domain() -> String {
        "https://activities.sugarlabs.org".into()
    }
    pub fn min_version() -> String {
        "0.116".into()
    }
    pub fn max_version() -> String {
        "0.117".into()
    }
}
