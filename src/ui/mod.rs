//! UI module for CI-friendly output
//!
//! Plain styled lines locally, workflow commands (annotations, groups,
//! outputs) when running under GitHub Actions.
//!
//! # Example
//!
//! ```rust,ignore
//! use sccache_action::ui::{self, UiContext};
//!
//! let ctx = UiContext::detect();
//!
//! ui::section(&ctx, "Install sccache");
//! ui::step_ok_detail(&ctx, "Installed", "/tmp/sccache/sccache");
//! ui::end_section(&ctx);
//!
//! ui::set_output(&ctx, "cache-hit", "true").await?;
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    add_path, end_section, escape_data, fail, in_section, key_value, section, set_output,
    step_info, step_ok, step_ok_detail, step_warn,
};
pub use progress::DownloadProgress;
