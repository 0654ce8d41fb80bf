//! Error types for sccache-action
//!
//! All modules use `ActionResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sccache-action operations
pub type ActionResult<T> = Result<T, ActionError>;

/// All errors that can occur while setting up or tearing down sccache
#[derive(Error, Debug)]
pub enum ActionError {
    // Release resolution errors
    #[error("Release not found: {release} in {repo}")]
    ReleaseNotFound { repo: String, release: String },

    #[error("No asset matching {pattern} in release {release}. Available: {}", available.join(", "))]
    AssetNotFound {
        release: String,
        pattern: String,
        available: Vec<String>,
    },

    #[error("Failed to query releases at {url}: {reason}")]
    ReleaseFetch { url: String, reason: String },

    #[error("GitHub API rate limit hit at {url} (HTTP {status})")]
    RateLimited { url: String, status: u16 },

    // Install errors
    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Failed to extract {}: {source}", archive.display())]
    Extract {
        archive: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Install failed: expected {} after extraction", expected.display())]
    Install { expected: PathBuf },

    // Toolchain errors
    #[error("Failed to write toolchain config {}: {source}", path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Cache errors
    #[error("Cache service error: {0}")]
    CacheService(String),

    #[error("Cache entry already exists: {0}")]
    CacheEntryExists(String),

    #[error("Path Validation Error: none of the cache paths exist: {}", paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    CacheValidation { paths: Vec<PathBuf> },

    // Process errors
    #[error("Command failed: {command}, exit code: {}", code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    Subprocess { command: String, code: Option<i32> },

    #[error("Command failed to start: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Could not determine the home directory")]
    HomeDirNotFound,

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a download error
    pub fn download(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Download {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error only means the cache already holds this key
    pub fn is_entry_exists(&self) -> bool {
        matches!(self, Self::CacheEntryExists(_))
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ReleaseNotFound { .. } => {
                Some("Use `latest` or an existing tag such as v0.8.1 for release-name")
            }
            Self::AssetNotFound { .. } => {
                Some("Check that arch is a target triple published for this release")
            }
            Self::RateLimited { .. } => Some("Pass a token input to raise the API rate limit"),
            Self::HomeDirNotFound => Some("Set the HOME environment variable"),
            _ => None,
        }
    }
}
