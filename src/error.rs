// src/error.rs

//! Unified error handling for the catalog generator.

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// ZIP archive could not be read
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Repository query failed
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Manifest text is malformed or lacks the `[Activity]` section
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Packaged bundle does not contain the expected manifest entry
    #[error("Invalid bundle {path}: {reason}")]
    InvalidBundle { path: String, reason: String },

    /// Child process exceeded its wait budget
    #[error("Build of {bundle} timed out after {secs}s")]
    BuildTimeout { bundle: String, secs: u64 },

    /// Child process exited with a non-zero code
    #[error("Build of {bundle} failed with exit code {code}")]
    BuildFailure { bundle: String, code: i32 },

    /// Version-control history or remote could not be queried
    #[error("Version control unavailable for {0}")]
    VersionControl(String),

    /// No packaged artifact was found for a bundle
    #[error("No packaged artifact for {0}")]
    MissingArtifact(String),

    /// Page template could not be rendered
    #[error("Render error for {template}: {message}")]
    Render { template: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Discovery was required to find at least one bundle
    #[error("No activities found in {0}")]
    NoBundlesFound(String),

    /// The user declined a destructive operation
    #[error("Aborted: {0}")]
    Aborted(String),
}

impl AppError {
    /// Create a manifest error.
    pub fn manifest(message: impl Into<String>) -> Self {
        Self::Manifest(message.into())
    }

    /// Create an invalid-bundle error for the given path.
    pub fn invalid_bundle(path: &Path, reason: impl fmt::Display) -> Self {
        Self::InvalidBundle {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a render error.
    pub fn render(template: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Render {
            template: template.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error should abort the whole run rather than skip one bundle.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::NoBundlesFound(_) | Self::Aborted(_) | Self::Toml(_)
        )
    }
}
