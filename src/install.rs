//! Fetch and install a release archive
//!
//! Release archives unpack to a single directory named after the asset
//! (`sccache-v0.8.1-x86_64-unknown-linux-musl/sccache`). That directory
//! replaces the install directory wholesale.

use crate::blocking;
use crate::error::{ActionError, ActionResult};
use crate::http;
use crate::release::Asset;
use crate::ui::UiContext;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::{debug, info};

/// Name of the executable inside the install directory
pub const EXECUTABLE: &str = "sccache";

/// Download `asset` and install it at `install_dir`, returning the executable path
pub async fn install(
    ctx: &UiContext,
    asset: &Asset,
    install_dir: &Path,
    token: Option<&str>,
) -> ActionResult<PathBuf> {
    let parent = staging_parent(install_dir);
    tokio::fs::create_dir_all(&parent)
        .await
        .map_err(|e| ActionError::io(format!("creating {}", parent.display()), e))?;

    // Downloads land next to the install dir so the final rename stays on one filesystem
    let download_dir = tempfile::Builder::new()
        .prefix(".sccache-download-")
        .tempdir_in(&parent)
        .map_err(|e| ActionError::io("creating download directory", e))?;
    let archive = download_dir.path().join(&asset.name);

    info!(asset = %asset.name, "Downloading sccache");
    let agent = http::agent();
    let url = asset.browser_download_url.clone();
    let token = token.map(str::to_string);
    let dest = archive.clone();
    let progress_ctx = ctx.clone();
    let label = asset.name.clone();
    let bytes = blocking(move || {
        http::download_to_file(&agent, &url, token.as_deref(), &dest, &progress_ctx, &label)
    })
    .await?;
    debug!(bytes, "Downloaded release archive");

    let stem = asset.archive_stem().to_string();
    let target = install_dir.to_path_buf();
    blocking(move || install_archive(&archive, &stem, &target)).await
}

/// Extract `archive` and move its `stem` directory to `install_dir`.
///
/// Blocking. Any previous install at `install_dir` is removed first.
pub fn install_archive(archive: &Path, stem: &str, install_dir: &Path) -> ActionResult<PathBuf> {
    let parent = staging_parent(install_dir);
    std::fs::create_dir_all(&parent)
        .map_err(|e| ActionError::io(format!("creating {}", parent.display()), e))?;

    let staging = tempfile::Builder::new()
        .prefix(".sccache-extract-")
        .tempdir_in(&parent)
        .map_err(|e| ActionError::io("creating extraction directory", e))?;

    extract(archive, staging.path()).map_err(|source| ActionError::Extract {
        archive: archive.to_path_buf(),
        source,
    })?;

    let extracted = staging.path().join(stem);
    if !extracted.is_dir() {
        return Err(ActionError::Install {
            expected: PathBuf::from(stem),
        });
    }

    remove_existing(install_dir)?;
    std::fs::rename(&extracted, install_dir)
        .map_err(|e| ActionError::io(format!("moving release to {}", install_dir.display()), e))?;

    let executable = install_dir.join(EXECUTABLE);
    if !executable.is_file() {
        return Err(ActionError::Install {
            expected: executable,
        });
    }
    make_executable(&executable)?;

    info!(path = %executable.display(), "Installed sccache");
    Ok(executable)
}

fn extract(archive: &Path, dest: &Path) -> std::io::Result<()> {
    let file = File::open(archive)?;
    let mut tar = Archive::new(GzDecoder::new(BufReader::new(file)));
    tar.unpack(dest)
}

fn staging_parent(install_dir: &Path) -> PathBuf {
    match install_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn remove_existing(path: &Path) -> ActionResult<()> {
    let result = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(_) => return Ok(()),
    };
    debug!(path = %path.display(), "Removed previous install");
    result.map_err(|e| ActionError::io(format!("removing {}", path.display()), e))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> ActionResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| ActionError::io(format!("chmod +x {}", path.display()), e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> ActionResult<()> {
    Ok(())
}
