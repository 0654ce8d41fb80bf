//! Setup command - install sccache, configure cargo, restore the cache
//!
//! Runs at the start of a job. Each step is awaited before the next begins;
//! the first failure ends the command. A cache that cannot be restored is
//! reported and treated as a miss.

use crate::cache::{self, CacheBackend, RestoreResult};
use crate::config::{Config, ConfigManager};
use crate::error::{ActionError, ActionResult};
use crate::install;
use crate::release::{self, GitHubReleases};
use crate::stats::Sccache;
use crate::toolchain;
use crate::ui::{self, UiContext};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Execute the setup command
pub async fn execute(config: &Config, ctx: &UiContext) -> ActionResult<()> {
    let executable = ui::in_section(ctx, "Install sccache", install_sccache(config, ctx)).await?;
    ui::in_section(ctx, "Configure cargo", configure_cargo(config, ctx, &executable)).await?;

    let backend = cache::create_backend(&config.cache)?;
    ui::in_section(ctx, "Restore cache", restore_cache(config, ctx, &*backend)).await?;

    ui::in_section(ctx, "Reset sccache stats", async {
        Sccache::new(&executable).reset_stats().await?;
        ui::step_ok(ctx, "Stats reset");
        Ok(())
    })
    .await
}

async fn install_sccache(config: &Config, ctx: &UiContext) -> ActionResult<PathBuf> {
    let source = GitHubReleases::new(&config.release);
    let asset = release::resolve(&source, &config.release.name, &config.release.arch).await?;
    ui::step_ok_detail(ctx, "Resolved release asset", &asset.name);

    let executable = install::install(
        ctx,
        &asset,
        &config.install.dir,
        config.release.token.as_deref(),
    )
    .await?;
    ui::step_ok_detail(ctx, "Installed", &executable.display().to_string());

    ui::add_path(ctx, &config.install.dir).await?;
    if let Some(version) = asset.version(&config.release.arch) {
        ui::set_output(ctx, "sccache-version", &version.to_string()).await?;
    }

    Ok(executable)
}

async fn configure_cargo(config: &Config, ctx: &UiContext, executable: &Path) -> ActionResult<()> {
    let cargo_config = match &config.toolchain.config_path {
        Some(path) => path.clone(),
        None => ConfigManager::default_cargo_config()?,
    };
    toolchain::configure_toolchain(&cargo_config, executable).await?;
    ui::step_ok_detail(ctx, "rustc-wrapper set", &cargo_config.display().to_string());
    Ok(())
}

/// Restore the sccache directory and publish the outcome.
///
/// Cache service failures and unreadable entries are warnings; the build
/// then starts cold.
pub async fn restore_cache(
    config: &Config,
    ctx: &UiContext,
    backend: &dyn CacheBackend,
) -> ActionResult<RestoreResult> {
    let paths = cache::cache_paths(&config.cache)?;
    ui::key_value(ctx, "backend", backend.name());
    ui::key_value(ctx, "key", &config.cache.key);

    let restored = match cache::restore(backend, &config.cache.key, &paths, Utc::now()).await {
        Ok(restored) => restored,
        Err(ActionError::CacheService(reason)) => {
            warn!(%reason, "Cache restore failed");
            ui::step_warn(ctx, &format!("Failed to restore cache: {}", reason));
            RestoreResult::default()
        }
        Err(e) => return Err(e),
    };

    match &restored.matched_key {
        Some(key) => ui::step_ok_detail(ctx, "Cache restored", key),
        None => ui::step_info(
            ctx,
            &format!("No cache found for key {}", config.cache.key),
        ),
    }
    ui::set_output(ctx, "cache-hit", if restored.hit { "true" } else { "false" }).await?;
    ui::set_output(
        ctx,
        "cache-matched-key",
        restored.matched_key.as_deref().unwrap_or_default(),
    )
    .await?;

    Ok(restored)
}
