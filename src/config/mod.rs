//! Configuration management for sccache-action

pub mod schema;

pub use schema::{CacheBackendKind, Config};

use crate::cli::args::InputArgs;
use crate::error::{ActionError, ActionResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
    explicit: bool,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
            explicit: false,
        }
    }

    /// Create a config manager with a custom path, which must exist
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: path,
            explicit: true,
        }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sccache-action")
            .join("config.toml")
    }

    /// Home directory of the current user
    pub fn home_dir() -> ActionResult<PathBuf> {
        dirs::home_dir().ok_or(ActionError::HomeDirNotFound)
    }

    /// Default sccache cache directory (`~/.cache/sccache`)
    pub fn default_cache_dir() -> ActionResult<PathBuf> {
        Ok(Self::home_dir()?.join(".cache").join("sccache"))
    }

    /// Default store for the local cache backend
    pub fn default_store_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sccache-action")
            .join("store")
    }

    /// Default cargo user config (`$CARGO_HOME/config.toml`)
    pub fn default_cargo_config() -> ActionResult<PathBuf> {
        let cargo_home = match std::env::var_os("CARGO_HOME").filter(|v| !v.is_empty()) {
            Some(home) => PathBuf::from(home),
            None => Self::home_dir()?.join(".cargo"),
        };
        Ok(cargo_home.join("config.toml"))
    }

    /// Load configuration, using defaults if the default file is absent
    pub async fn load(&self) -> ActionResult<Config> {
        if !self.config_path.exists() {
            if self.explicit {
                return Err(ActionError::ConfigNotFound(self.config_path.clone()));
            }
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> ActionResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ActionError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| ActionError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load configuration and layer action inputs on top
    pub async fn load_with_inputs(&self, inputs: &InputArgs) -> ActionResult<Config> {
        let mut config = self.load().await?;
        apply_inputs(&mut config, inputs);
        Ok(config)
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Overlay non-empty inputs onto a loaded configuration
pub fn apply_inputs(config: &mut Config, inputs: &InputArgs) {
    fn given(value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    if let Some(key) = given(&inputs.cache_key) {
        config.cache.key = key;
    }
    if let Some(name) = given(&inputs.release_name) {
        config.release.name = name;
    }
    if let Some(arch) = given(&inputs.arch) {
        config.release.arch = arch;
    }
    if let Some(token) = given(&inputs.token).or_else(|| given(&inputs.github_token)) {
        config.release.token = Some(token);
    }
    if let Some(dir) = &inputs.install_dir {
        config.install.dir = dir.clone();
    }
    if let Some(backend) = inputs.cache_backend {
        config.cache.backend = backend;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager {
            config_path: temp.path().join("nonexistent.toml"),
            explicit: false,
        };

        let config = manager.load().await.unwrap();
        assert_eq!(config.release.repo, "mozilla/sccache");
    }

    #[tokio::test]
    async fn explicit_path_must_exist() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("missing.toml"));

        let err = manager.load().await.unwrap_err();
        assert!(matches!(err, ActionError::ConfigNotFound(_)));
    }

    #[tokio::test]
    async fn invalid_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[cache]\nbackend = \"s3\"\n").unwrap();

        let err = ConfigManager::with_path(path.clone()).load().await.unwrap_err();
        match err {
            ActionError::ConfigInvalid { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn inputs_override_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "[release]\nname = \"v0.7.7\"\narch = \"aarch64-unknown-linux-musl\"\n",
        )
        .unwrap();

        let inputs = InputArgs {
            release_name: Some("v0.8.1".to_string()),
            arch: Some(String::new()),
            cache_key: Some("sccache-linux".to_string()),
            ..InputArgs::default()
        };

        let config = ConfigManager::with_path(path)
            .load_with_inputs(&inputs)
            .await
            .unwrap();

        assert_eq!(config.release.name, "v0.8.1");
        // Empty inputs count as unset
        assert_eq!(config.release.arch, "aarch64-unknown-linux-musl");
        assert_eq!(config.cache.key, "sccache-linux");
    }

    #[test]
    fn token_falls_back_to_github_token() {
        let mut config = Config::default();
        let inputs = InputArgs {
            token: Some(" ".to_string()),
            github_token: Some("ghs_fallback".to_string()),
            ..InputArgs::default()
        };

        apply_inputs(&mut config, &inputs);
        assert_eq!(config.release.token.as_deref(), Some("ghs_fallback"));
    }

    #[test]
    #[serial_test::serial]
    fn cargo_config_honors_cargo_home() {
        let previous = std::env::var_os("CARGO_HOME");
        std::env::set_var("CARGO_HOME", "/opt/cargo");

        let path = ConfigManager::default_cargo_config().unwrap();

        match previous {
            Some(value) => std::env::set_var("CARGO_HOME", value),
            None => std::env::remove_var("CARGO_HOME"),
        }
        assert_eq!(path, PathBuf::from("/opt/cargo/config.toml"));
    }
}
