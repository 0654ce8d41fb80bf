//! sccache statistics: zero counters at setup, print them at teardown

use crate::error::{ActionError, ActionResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Runs the installed sccache executable
#[derive(Debug, Clone)]
pub struct Sccache {
    executable: PathBuf,
}

impl Sccache {
    /// Wrap the executable at `executable`
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Path of the wrapped executable
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Zero the usage counters (`sccache -z`)
    pub async fn reset_stats(&self) -> ActionResult<()> {
        self.run("-z").await
    }

    /// Print the usage counters (`sccache -s`)
    pub async fn report_stats(&self) -> ActionResult<()> {
        self.run("-s").await
    }

    /// Run sccache with a single flag, output going straight to the job log
    async fn run(&self, flag: &str) -> ActionResult<()> {
        let command = format!("{} {}", self.executable.display(), flag);
        debug!("Executing: {}", command);

        let status = Command::new(&self.executable)
            .arg(flag)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| ActionError::command_failed(&command, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(ActionError::Subprocess {
                command,
                code: status.code(),
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Fake sccache that keeps a counter file next to itself
    fn fake_sccache(dir: &Path) -> PathBuf {
        let path = dir.join("sccache");
        let script = r#"#!/bin/sh
state="$(dirname "$0")/requests"
case "$1" in
  -z) echo 0 > "$state"; echo "Statistics zeroed." ;;
  -s) echo "Compile requests $(cat "$state" 2>/dev/null || echo 0)" ;;
  *) exit 2 ;;
esac
"#;
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn reset_then_report_without_builds() {
        let temp = TempDir::new().unwrap();
        let sccache = Sccache::new(fake_sccache(temp.path()));

        sccache.reset_stats().await.unwrap();
        sccache.report_stats().await.unwrap();

        let counter = std::fs::read_to_string(temp.path().join("requests")).unwrap();
        assert_eq!(counter.trim(), "0");
    }

    #[tokio::test]
    async fn non_zero_exit_is_subprocess_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sccache");
        std::fs::write(&path, "#!/bin/sh\nexit 3\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = Sccache::new(path).report_stats().await.unwrap_err();
        match err {
            ActionError::Subprocess { command, code } => {
                assert!(command.ends_with(" -s"));
                assert_eq!(code, Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_executable_is_command_failed() {
        let temp = TempDir::new().unwrap();
        let err = Sccache::new(temp.path().join("absent"))
            .reset_stats()
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::CommandFailed { .. }));
    }
}
