//! Integration tests for the dexview binary

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// Isolated config/cache directories plus a config file
struct TestEnv {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl TestEnv {
    fn new(config: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, config).unwrap();
        Self {
            temp_dir,
            config_path,
        }
    }

    /// Provider pointed at a port nothing listens on
    fn unreachable() -> Self {
        Self::new(
            r#"
[api]
base_url = "http://127.0.0.1:9/api/v2"
timeout_secs = 2
"#,
        )
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("dexview").unwrap();
        cmd.env("HOME", self.temp_dir.path())
            .env("XDG_CONFIG_HOME", self.temp_dir.path().join("config"))
            .env("XDG_CACHE_HOME", self.temp_dir.path().join("cache"))
            .arg("--config")
            .arg(&self.config_path);
        cmd
    }
}

// =============================================================================
// CLI surface
// =============================================================================

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("dexview")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("catalog"))
        .stdout(predicate::str::contains("members"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_members_requires_group() {
    let env = TestEnv::unreachable();
    env.cmd().arg("members").assert().failure();
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_missing_explicit_config_is_rejected() {
    let env = TestEnv::unreachable();
    Command::cargo_bin("dexview")
        .unwrap()
        .env("XDG_CACHE_HOME", env.temp_dir.path().join("cache"))
        .args(["--config"])
        .arg(env.temp_dir.path().join("nope.toml"))
        .arg("catalog")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn test_invalid_toml_is_rejected() {
    let env = TestEnv::new("[api\nbase_url = ");
    env.cmd()
        .arg("catalog")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn test_key_collision_is_rejected() {
    let env = TestEnv::new(
        r#"
[keys.groups]
next = "x"
toggle = "x"
"#,
    );
    env.cmd()
        .arg("catalog")
        .assert()
        .failure()
        .stderr(predicate::str::contains("key binding collision"));
}

// =============================================================================
// Provider failures
// =============================================================================

#[test]
fn test_catalog_fails_fast_when_provider_unreachable() {
    let env = TestEnv::unreachable();
    env.cmd()
        .arg("catalog")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load group catalog"));
}

#[test]
fn test_browser_aborts_before_terminal_setup() {
    let env = TestEnv::unreachable();
    env.cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load group catalog"));
}

#[test]
fn test_members_fails_when_every_group_fails() {
    let env = TestEnv::unreachable();
    env.cmd()
        .args(["members", "kanto", "national"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("skipping kanto"))
        .stderr(predicate::str::contains("skipping national"))
        .stderr(predicate::str::contains("no pokedex could be loaded"));
}

#[test]
fn test_show_reports_pokemon_in_error() {
    let env = TestEnv::unreachable();
    env.cmd()
        .args(["show", "25"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load pokemon 25"));
}
