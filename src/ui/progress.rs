//! Download progress with CI fallback

use super::context::UiContext;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Read;

/// Byte progress for a download.
///
/// Shows an indicatif bar in interactive mode and stays silent in CI, where
/// the log only needs the start and end of the transfer.
pub struct DownloadProgress {
    bar: Option<ProgressBar>,
}

impl DownloadProgress {
    /// Create a progress indicator for `label`, sized when the length is known
    pub fn new(ctx: &UiContext, label: &str, total: Option<u64>) -> Self {
        if !ctx.use_fancy_output() {
            return Self { bar: None };
        }

        let bar = match total {
            Some(len) => {
                let bar = ProgressBar::new(len);
                if let Ok(style) = ProgressStyle::default_bar().template(
                    "  {spinner:.cyan} {prefix}  {bar:24.cyan/dim} {bytes}/{total_bytes} {elapsed:.dim}",
                ) {
                    bar.set_style(style.progress_chars("━╸─"));
                }
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                if let Ok(style) =
                    ProgressStyle::default_spinner().template("  {spinner:.cyan} {prefix}  {bytes}")
                {
                    bar.set_style(style);
                }
                bar
            }
        };
        bar.set_prefix(label.to_string());
        Self { bar: Some(bar) }
    }

    /// Wrap a reader so consumed bytes advance the bar
    pub fn wrap<R: Read + 'static>(&self, reader: R) -> Box<dyn Read> {
        match self.bar {
            Some(ref bar) => Box::new(bar.wrap_read(reader)),
            None => Box::new(reader),
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
