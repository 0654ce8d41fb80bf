//! sccache-action - sccache for CI pipelines
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use sccache_action::cli::{commands, Cli, Commands};
use sccache_action::config::ConfigManager;
use sccache_action::error::ActionResult;
use sccache_action::ui::{self, UiContext};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug; a debug-enabled runner always gets debug
    let runner_debug = std::env::var("RUNNER_DEBUG").is_ok_and(|v| v == "1");
    let filter = match cli.verbose {
        _ if runner_debug => EnvFilter::new("sccache_action=debug"),
        0 => EnvFilter::new("sccache_action=warn"),
        1 => EnvFilter::new("sccache_action=info"),
        _ => EnvFilter::new("sccache_action=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let ctx = UiContext::detect();
    match run(cli, &ctx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::fail(&ctx, &e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, ctx: &UiContext) -> ActionResult<()> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = manager.load_with_inputs(cli.inputs()).await?;
    debug!(config = %manager.path().display(), "Loaded configuration");

    match cli.command {
        Commands::Setup(_) => commands::setup(&config, ctx).await,
        Commands::Post(_) => commands::post(&config, ctx).await,
        Commands::Config(args) => commands::config(args, &manager, &config),
    }
}
