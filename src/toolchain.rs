//! Cargo configuration for the sccache compiler wrapper
//!
//! The user-level cargo config is overwritten, not merged: after setup it
//! contains exactly one `[build] rustc-wrapper` directive. Anything a previous
//! step wrote there is discarded.

use crate::error::{ActionError, ActionResult};
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

#[derive(Serialize)]
struct CargoConfig<'a> {
    build: BuildSection<'a>,
}

#[derive(Serialize)]
struct BuildSection<'a> {
    #[serde(rename = "rustc-wrapper")]
    rustc_wrapper: &'a str,
}

/// Render the cargo config pointing `rustc-wrapper` at `executable`
pub fn render(executable: &Path) -> ActionResult<String> {
    let wrapper = executable.to_string_lossy();
    let config = CargoConfig {
        build: BuildSection {
            rustc_wrapper: &wrapper,
        },
    };
    Ok(toml::to_string(&config)?)
}

/// Overwrite `config_path` so cargo wraps rustc with `executable`
pub async fn configure_toolchain(config_path: &Path, executable: &Path) -> ActionResult<()> {
    let content = render(executable)?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| ActionError::ConfigWrite {
                path: config_path.to_path_buf(),
                source,
            })?;
    }

    if fs::try_exists(config_path).await.unwrap_or(false) {
        warn!(path = %config_path.display(), "Overwriting existing cargo config");
    }

    fs::write(config_path, content)
        .await
        .map_err(|source| ActionError::ConfigWrite {
            path: config_path.to_path_buf(),
            source,
        })?;

    info!(path = %config_path.display(), wrapper = %executable.display(), "Configured cargo");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn renders_wrapper_directive() {
        let content = render(Path::new("/tmp/sccache/sccache")).unwrap();
        assert_eq!(content, "[build]\nrustc-wrapper = \"/tmp/sccache/sccache\"\n");
    }

    #[tokio::test]
    async fn configure_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".cargo").join("config.toml");
        let exe = Path::new("/tmp/sccache/sccache");

        configure_toolchain(&path, exe).await.unwrap();
        let once = std::fs::read_to_string(&path).unwrap();
        configure_toolchain(&path, exe).await.unwrap();
        let twice = std::fs::read_to_string(&path).unwrap();

        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn existing_config_is_replaced() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[net]\ngit-fetch-with-cli = true\n").unwrap();

        configure_toolchain(&path, Path::new("/opt/sccache")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("[net]"));
        assert!(content.contains("rustc-wrapper = \"/opt/sccache\""));
    }

    #[tokio::test]
    async fn unwritable_target_is_config_write_error() {
        let temp = TempDir::new().unwrap();
        // A directory where the file should be
        let path = temp.path().join("config.toml");
        std::fs::create_dir(&path).unwrap();

        let err = configure_toolchain(&path, Path::new("/opt/sccache"))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::ConfigWrite { .. }));
    }
}
