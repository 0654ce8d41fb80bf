//! Config command - show the effective configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::ActionResult;

/// Execute the config command
pub fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> ActionResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => print!("{}", render(config)?),
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
    }
    Ok(())
}

/// Render the configuration as TOML with the token masked
pub fn render(config: &Config) -> ActionResult<String> {
    let mut shown = config.clone();
    if shown.release.token.is_some() {
        shown.release.token = Some("***".to_string());
    }
    Ok(toml::to_string_pretty(&shown)?)
}
