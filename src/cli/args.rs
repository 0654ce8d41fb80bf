//! CLI argument definitions using clap derive

use crate::config::CacheBackendKind;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// sccache-action - sccache for CI pipelines
///
/// Installs a prebuilt sccache, points cargo at it, and keeps its cache
/// warm between CI runs.
#[derive(Parser, Debug)]
#[command(name = "sccache-action")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SCCACHE_ACTION_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install sccache, configure cargo, restore the cache and reset stats
    Setup(InputArgs),

    /// Print sccache stats and save the cache (job teardown)
    Post(InputArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Action inputs, readable from flags or the runner's INPUT_* variables
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Cache key; saved verbatim and used as the restore prefix
    #[arg(long, env = "INPUT_CACHE-KEY")]
    pub cache_key: Option<String>,

    /// Release to install: "latest" or a tag such as v0.8.1
    #[arg(long, env = "INPUT_RELEASE-NAME")]
    pub release_name: Option<String>,

    /// Target triple in the release asset name
    #[arg(long, env = "INPUT_ARCH")]
    pub arch: Option<String>,

    /// Token for authenticated GitHub requests
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Fallback token provided by the runner
    #[arg(skip = std::env::var("GITHUB_TOKEN").ok())]
    pub github_token: Option<String>,

    /// Directory receiving the sccache release
    #[arg(long)]
    pub install_dir: Option<PathBuf>,

    /// Cache service used to restore and save the sccache directory
    #[arg(long, value_enum)]
    pub cache_backend: Option<CacheBackendKind>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Config action
    #[command(subcommand)]
    pub action: Option<ConfigAction>,

    /// Inputs layered over the file before showing
    #[command(flatten)]
    pub inputs: InputArgs,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show effective configuration
    Show,

    /// Show config file path
    Path,
}

impl Cli {
    /// Inputs carried by the selected subcommand
    pub fn inputs(&self) -> &InputArgs {
        match &self.command {
            Commands::Setup(inputs) | Commands::Post(inputs) => inputs,
            Commands::Config(args) => &args.inputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn setup_flags_parse() {
        let cli = Cli::try_parse_from([
            "sccache-action",
            "-vv",
            "setup",
            "--release-name",
            "v0.8.1",
            "--arch",
            "aarch64-unknown-linux-musl",
            "--cache-backend",
            "local",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let inputs = cli.inputs();
        assert_eq!(inputs.release_name.as_deref(), Some("v0.8.1"));
        assert_eq!(inputs.arch.as_deref(), Some("aarch64-unknown-linux-musl"));
        assert_eq!(inputs.cache_backend, Some(CacheBackendKind::Local));
    }

    #[test]
    fn config_defaults_to_show() {
        let cli = Cli::try_parse_from(["sccache-action", "config"]).unwrap();
        match cli.command {
            Commands::Config(args) => assert!(args.action.is_none()),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
