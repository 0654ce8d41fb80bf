//! Configuration schema for sccache-action
//!
//! Configuration is optional and stored at `~/.config/sccache-action/config.toml`.
//! Action inputs and command-line flags are layered on top.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where sccache releases come from
    pub release: ReleaseConfig,

    /// Where the executable is installed
    pub install: InstallConfig,

    /// Cargo configuration target
    pub toolchain: ToolchainConfig,

    /// Persistent cache settings
    pub cache: CacheConfig,
}

/// Release lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// GitHub repository publishing the releases
    pub repo: String,

    /// Release tag, or "latest"
    pub name: String,

    /// Target triple used in asset names
    pub arch: String,

    /// GitHub REST API base URL
    pub api_url: String,

    /// Bearer token for API requests and downloads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            repo: "mozilla/sccache".to_string(),
            name: "latest".to_string(),
            arch: "x86_64-unknown-linux-musl".to_string(),
            api_url: "https://api.github.com".to_string(),
            token: None,
        }
    }
}

/// Install location settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Directory receiving the extracted release
    pub dir: PathBuf,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/tmp/sccache"),
        }
    }
}

impl InstallConfig {
    /// Path of the installed sccache executable
    pub fn executable(&self) -> PathBuf {
        self.dir.join("sccache")
    }
}

/// Cargo configuration settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Cargo config file to overwrite (defaults to `$CARGO_HOME/config.toml`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
}

/// Which cache service persists the sccache directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// GitHub Actions cache when its runtime variables are present, local otherwise
    #[default]
    Auto,
    /// GitHub Actions cache service
    Actions,
    /// Directory store on this machine
    Local,
}

/// Persistent cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache key saved verbatim and used as the restore prefix
    pub key: String,

    /// Local sccache directory (defaults to `~/.cache/sccache`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Cache service to use
    pub backend: CacheBackendKind,

    /// Store directory for the local backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key: "sccache".to_string(),
            dir: None,
            backend: CacheBackendKind::Auto,
            store_dir: None,
        }
    }
}
