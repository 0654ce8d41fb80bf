//! Post command - print sccache stats and save the cache
//!
//! Runs at job teardown. Stats are printed first so a failing save never
//! hides them.

use crate::cache::{self, CacheBackend, SaveOutcome};
use crate::config::Config;
use crate::error::ActionResult;
use crate::stats::Sccache;
use crate::ui::{self, UiContext};

/// Execute the post command
pub async fn execute(config: &Config, ctx: &UiContext) -> ActionResult<()> {
    ui::in_section(
        ctx,
        "sccache stats",
        Sccache::new(config.install.executable()).report_stats(),
    )
    .await?;

    let backend = cache::create_backend(&config.cache)?;
    save_cache(config, ctx, &*backend).await.map(|_| ())
}

/// Save the sccache directory under the configured key
pub async fn save_cache(
    config: &Config,
    ctx: &UiContext,
    backend: &dyn CacheBackend,
) -> ActionResult<SaveOutcome> {
    let outcome = ui::in_section(ctx, "Save cache", async {
        let paths = cache::cache_paths(&config.cache)?;
        cache::save(backend, &config.cache.key, &paths).await
    })
    .await?;

    match outcome {
        SaveOutcome::Saved => ui::step_ok_detail(ctx, "Cache saved", &config.cache.key),
        SaveOutcome::AlreadyExists => ui::step_warn(
            ctx,
            &format!(
                "Cache entry {} already exists and was not updated",
                config.cache.key
            ),
        ),
    }
    Ok(outcome)
}
