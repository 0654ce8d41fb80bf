//! Integration tests for sccache-action

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// Command with the runner environment scrubbed
    fn action() -> Command {
        let mut cmd = cargo_bin_cmd!("sccache-action");
        for var in [
            "GITHUB_ACTIONS",
            "GITHUB_OUTPUT",
            "GITHUB_PATH",
            "GITHUB_TOKEN",
            "RUNNER_DEBUG",
            "SCCACHE_ACTION_CONFIG",
            "ACTIONS_RESULTS_URL",
            "ACTIONS_RUNTIME_TOKEN",
            "INPUT_CACHE-KEY",
            "INPUT_RELEASE-NAME",
            "INPUT_ARCH",
            "INPUT_TOKEN",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }

    fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn help_displays() {
        action()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("sccache for CI pipelines"));
    }

    #[test]
    fn version_displays() {
        action()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("sccache-action"));
    }

    #[test]
    fn config_show_defaults() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path(), "");

        action()
            .args(["config", "show", "--config"])
            .arg(&config)
            .assert()
            .success()
            .stdout(predicate::str::contains("[release]"))
            .stdout(predicate::str::contains("repo = \"mozilla/sccache\""))
            .stdout(predicate::str::contains("arch = \"x86_64-unknown-linux-musl\""));
    }

    #[test]
    fn inputs_override_file() {
        let temp = TempDir::new().unwrap();
        let config = write_config(
            temp.path(),
            "[release]\narch = \"aarch64-apple-darwin\"\n\n[cache]\nkey = \"from-file\"\n",
        );

        action()
            .args(["config", "show", "--config"])
            .arg(&config)
            .env("INPUT_CACHE-KEY", "sccache-v1")
            .env("INPUT_RELEASE-NAME", "")
            .assert()
            .success()
            .stdout(predicate::str::contains("arch = \"aarch64-apple-darwin\""))
            .stdout(predicate::str::contains("key = \"sccache-v1\""))
            .stdout(predicate::str::contains("name = \"latest\""));
    }

    #[test]
    fn token_is_never_printed() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path(), "");

        action()
            .args(["config", "--token", "ghp_not_for_logs", "show", "--config"])
            .arg(&config)
            .assert()
            .success()
            .stdout(predicate::str::contains("token = \"***\""))
            .stdout(predicate::str::contains("ghp_not_for_logs").not());
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path(), "");

        action()
            .args(["config", "path", "--config"])
            .arg(&config)
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn missing_explicit_config_fails() {
        let temp = TempDir::new().unwrap();

        action()
            .args(["config", "show", "--config"])
            .arg(temp.path().join("absent.toml"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"));
    }

    #[test]
    fn invalid_config_fails() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path(), "[cache]\nbackend = \"s3\"\n");

        action()
            .args(["config", "show", "--config"])
            .arg(&config)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn failure_is_annotated_under_actions() {
        let temp = TempDir::new().unwrap();

        action()
            .args(["config", "show", "--config"])
            .arg(temp.path().join("absent.toml"))
            .env("GITHUB_ACTIONS", "true")
            .assert()
            .failure()
            .stdout(predicate::str::starts_with("::error::Configuration file not found"));
    }

    #[test]
    fn setup_fails_when_releases_are_unreachable() {
        let temp = TempDir::new().unwrap();
        let config = write_config(
            temp.path(),
            &format!(
                "[release]\napi_url = \"http://127.0.0.1:9\"\n\n[install]\ndir = \"{}\"\n",
                temp.path().join("sccache").display()
            ),
        );

        action()
            .args(["setup", "--config"])
            .arg(&config)
            .env("GITHUB_ACTIONS", "true")
            .assert()
            .failure()
            .stdout(predicate::str::contains(
                "::group::Install sccache\n::endgroup::\n::error::Failed to query releases",
            ));

        assert!(!temp.path().join("sccache").exists());
    }

    #[cfg(unix)]
    mod post {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        /// Lay out an installed fake sccache, a cache dir and a config pointing at both
        fn fixture(temp: &TempDir) -> std::path::PathBuf {
            let install = temp.path().join("install");
            std::fs::create_dir_all(&install).unwrap();
            let exe = install.join("sccache");
            std::fs::write(&exe, "#!/bin/sh\necho \"Compile requests 7\"\n").unwrap();
            std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

            let cache_dir = temp.path().join("cache");
            std::fs::create_dir_all(&cache_dir).unwrap();
            std::fs::write(cache_dir.join("object"), "compiled").unwrap();

            write_config(
                temp.path(),
                &format!(
                    "[install]\ndir = \"{}\"\n\n[cache]\nkey = \"sccache-v1\"\ndir = \"{}\"\nbackend = \"local\"\nstore_dir = \"{}\"\n",
                    install.display(),
                    cache_dir.display(),
                    temp.path().join("store").display()
                ),
            )
        }

        #[test]
        fn post_reports_then_saves() {
            let temp = TempDir::new().unwrap();
            let config = fixture(&temp);

            action()
                .args(["post", "--config"])
                .arg(&config)
                .env("GITHUB_ACTIONS", "true")
                .assert()
                .success()
                .stdout(predicate::str::contains("Compile requests 7"))
                .stdout(predicate::str::contains("::group::Save cache"));

            let entries = std::fs::read_dir(temp.path().join("store")).unwrap().count();
            assert_eq!(entries, 1);
        }

        #[test]
        fn second_post_warns_about_existing_entry() {
            let temp = TempDir::new().unwrap();
            let config = fixture(&temp);

            action()
                .args(["post", "--config"])
                .arg(&config)
                .assert()
                .success();

            action()
                .args(["post", "--config"])
                .arg(&config)
                .env("GITHUB_ACTIONS", "true")
                .assert()
                .success()
                .stdout(predicate::str::contains(
                    "::warning::Cache entry sccache-v1 already exists",
                ));
        }

        #[test]
        fn post_without_sccache_fails_before_saving() {
            let temp = TempDir::new().unwrap();
            let config = fixture(&temp);
            std::fs::remove_file(temp.path().join("install").join("sccache")).unwrap();

            action()
                .args(["post", "--config"])
                .arg(&config)
                .env("GITHUB_ACTIONS", "true")
                .assert()
                .failure()
                .stdout(predicate::str::contains(
                    "::group::sccache stats\n::endgroup::\n::error::Command failed to start",
                ));

            assert!(!temp.path().join("store").exists());
        }
    }
}
