//! UI context for detecting interactive, CI and GitHub Actions environments

use std::io::IsTerminal;
use std::path::PathBuf;

/// UI context that determines output behavior
#[derive(Debug, Clone, Default)]
pub struct UiContext {
    /// Whether running in an interactive terminal
    interactive: bool,
    /// Whether the GitHub Actions runner understands workflow commands
    github_actions: bool,
    /// File receiving step outputs (`$GITHUB_OUTPUT`)
    output_file: Option<PathBuf>,
    /// File receiving PATH additions (`$GITHUB_PATH`)
    path_file: Option<PathBuf>,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        let github_actions = std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true");
        Self {
            interactive: Self::detect_interactive(),
            github_actions,
            output_file: env_path("GITHUB_OUTPUT"),
            path_file: env_path("GITHUB_PATH"),
        }
    }

    /// Create a plain non-interactive context (for testing or local scripting)
    pub fn non_interactive() -> Self {
        Self::default()
    }

    /// Create a GitHub Actions context writing outputs to the given files
    pub fn github_actions(output_file: Option<PathBuf>, path_file: Option<PathBuf>) -> Self {
        Self {
            interactive: false,
            github_actions: true,
            output_file,
            path_file,
        }
    }

    /// Check if we're in an interactive terminal
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Check if workflow commands (`::error::`, `::group::`) should be emitted
    pub fn is_github_actions(&self) -> bool {
        self.github_actions
    }

    /// Check if we should use fancy output (progress bars, colors)
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }

    /// `$GITHUB_OUTPUT` file, if any
    pub fn output_file(&self) -> Option<&PathBuf> {
        self.output_file.as_ref()
    }

    /// `$GITHUB_PATH` file, if any
    pub fn path_file(&self) -> Option<&PathBuf> {
        self.path_file.as_ref()
    }

    /// Detect if running in an interactive environment
    fn detect_interactive() -> bool {
        if !std::io::stdout().is_terminal() {
            return false;
        }

        if std::env::var("CI").is_ok() {
            return false;
        }

        let ci_vars = [
            "GITHUB_ACTIONS",
            "GITLAB_CI",
            "CIRCLECI",
            "TRAVIS",
            "JENKINS_URL",
            "BUILDKITE",
            "TF_BUILD",
        ];

        !ci_vars.iter().any(|var| std::env::var(var).is_ok())
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
