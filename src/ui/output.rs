//! Output functions for consistent CLI and workflow-command formatting
//!
//! Under GitHub Actions, errors and warnings become annotations and steps
//! become collapsible groups. Elsewhere the same events print as styled lines.

use super::context::UiContext;
use crate::error::{ActionError, ActionResult};
use console::style;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Escape a message for a workflow command
pub fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Start a step section
pub fn section(ctx: &UiContext, title: &str) {
    if ctx.is_github_actions() {
        println!("::group::{}", escape_data(title));
    } else {
        println!();
        println!("{}", style(title).bold());
    }
}

/// End the current step section
pub fn end_section(ctx: &UiContext) {
    if ctx.is_github_actions() {
        println!("::endgroup::");
    }
}

/// Run `step` inside a section that is closed whether or not it succeeds
pub async fn in_section<T, F>(ctx: &UiContext, title: &str, step: F) -> ActionResult<T>
where
    F: Future<Output = ActionResult<T>>,
{
    section(ctx, title);
    let result = step.await;
    end_section(ctx);
    result
}

/// Display a success step
pub fn step_ok(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        println!("  {} {}", style("✓").green(), message);
    } else {
        println!("  {} {}", style("[OK]").green(), message);
    }
}

/// Display a success step with detail
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.use_fancy_output() {
        println!("  {} {} ({})", style("✓").green(), message, style(detail).dim());
    } else {
        println!("  {} {} ({})", style("[OK]").green(), message, detail);
    }
}

/// Display an info step
pub fn step_info(_ctx: &UiContext, message: &str) {
    println!("  {} {}", style("[INFO]").cyan(), message);
}

/// Display a warning, as an annotation under GitHub Actions
pub fn step_warn(ctx: &UiContext, message: &str) {
    if ctx.is_github_actions() {
        println!("::warning::{}", escape_data(message));
    } else {
        println!("  {} {}", style("[WARN]").yellow(), message);
    }
}

/// Report a failed entry point: one error annotation plus an optional hint
pub fn fail(ctx: &UiContext, error: &ActionError) {
    if ctx.is_github_actions() {
        println!("::error::{}", escape_data(&error.to_string()));
        if let Some(hint) = error.hint() {
            println!("::notice::{}", escape_data(hint));
        }
    } else {
        eprintln!("{} {}", style("Error:").red().bold(), error);
        if let Some(hint) = error.hint() {
            eprintln!("{} {}", style("Hint:").yellow(), hint);
        }
    }
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Publish a step output through `$GITHUB_OUTPUT`
pub async fn set_output(ctx: &UiContext, name: &str, value: &str) -> ActionResult<()> {
    let Some(file) = ctx.output_file() else {
        return Ok(());
    };

    let entry = if value.contains('\n') || value.contains('\r') {
        let digest = hex::encode(Sha256::digest(value.as_bytes()));
        let delimiter = format!("ghadelimiter_{}", &digest[..16]);
        format!("{}<<{}\n{}\n{}\n", name, delimiter, value, delimiter)
    } else {
        format!("{}={}\n", name, value)
    };

    append(file, &entry).await
}

/// Prepend a directory to PATH for later steps through `$GITHUB_PATH`
pub async fn add_path(ctx: &UiContext, dir: &Path) -> ActionResult<()> {
    match ctx.path_file() {
        Some(file) => append(file, &format!("{}\n", dir.display())).await,
        None => Ok(()),
    }
}

async fn append(path: &Path, content: &str) -> ActionResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| ActionError::io(format!("opening {}", path.display()), e))?;

    file.write_all(content.as_bytes())
        .await
        .map_err(|e| ActionError::io(format!("writing {}", path.display()), e))?;
    file.flush()
        .await
        .map_err(|e| ActionError::io(format!("flushing {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn output_non_interactive() {
        let ctx = UiContext::non_interactive();
        section(&ctx, "Install");
        step_ok(&ctx, "Step completed");
        step_warn(&ctx, "Warning");
        end_section(&ctx);
        fail(&ctx, &ActionError::Internal("boom".to_string()));
    }

    #[tokio::test]
    async fn section_result_passes_through() {
        let ctx = UiContext::github_actions(None, None);

        let ok = in_section(&ctx, "Step", async { Ok(7) }).await.unwrap();
        assert_eq!(ok, 7);

        let err = in_section(&ctx, "Step", async {
            Err::<(), _>(ActionError::Internal("boom".to_string()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ActionError::Internal(_)));
    }

    #[test]
    fn escape_workflow_data() {
        assert_eq!(escape_data("50% done\r\nnext"), "50%25 done%0D%0Anext");
        assert_eq!(escape_data("plain"), "plain");
    }

    #[tokio::test]
    async fn outputs_append_to_file() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("output");
        let paths = temp.path().join("path");
        let ctx = UiContext::github_actions(Some(out.clone()), Some(paths.clone()));

        set_output(&ctx, "cache-hit", "true").await.unwrap();
        set_output(&ctx, "cache-matched-key", "sccache-v1").await.unwrap();
        add_path(&ctx, Path::new("/tmp/sccache")).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "cache-hit=true\ncache-matched-key=sccache-v1\n"
        );
        assert_eq!(std::fs::read_to_string(&paths).unwrap(), "/tmp/sccache\n");
    }

    #[tokio::test]
    async fn multiline_output_uses_delimiter() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("output");
        let ctx = UiContext::github_actions(Some(out.clone()), None);

        set_output(&ctx, "stats", "a\nb").await.unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        let mut lines = written.lines();
        let header = lines.next().unwrap();
        let delimiter = header.strip_prefix("stats<<").unwrap();
        assert!(delimiter.starts_with("ghadelimiter_"));
        assert_eq!(lines.collect::<Vec<_>>(), vec!["a", "b", delimiter]);
    }

    #[tokio::test]
    async fn outputs_are_skipped_outside_actions() {
        let ctx = UiContext::non_interactive();
        set_output(&ctx, "cache-hit", "false").await.unwrap();
        add_path(&ctx, Path::new("/tmp/sccache")).await.unwrap();
    }
}
