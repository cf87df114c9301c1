use std::fs;
use std::path::PathBuf;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

struct CliEnv {
    _tmp: TempDir,
    root: PathBuf,
}

impl CliEnv {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        Self { _tmp: tmp, root }
    }

    fn session_metrics(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("session-metrics"));
        cmd.current_dir(&self.root)
            .env_remove("SESSION_METRICS_CONFIG")
            .env("RUST_LOG", "info");
        cmd
    }
}

#[test]
fn no_data_exits_cleanly_without_output() {
    let env = CliEnv::new();

    env.session_metrics()
        .assert()
        .success()
        .stdout(predicate::str::contains("Loading data..."))
        .stdout(predicate::str::contains("No data found in data"));

    assert!(!env.root.join("docs").exists());
}

#[test]
fn default_layout_writes_report() {
    let env = CliEnv::new();
    fs::create_dir_all(env.root.join("data")).unwrap();
    fs::write(
        env.root.join("data/North.csv"),
        "Region,Session,DA Pre,DA Post\nNorth,N1,4,8\nNorth,N2,5,\n",
    )
    .unwrap();

    env.session_metrics().assert().success();

    let csv = fs::read_to_string(env.root.join("docs/aggregated_metrics.csv")).unwrap();
    assert!(csv.starts_with("Region,Unique Students,"));
    assert!(csv.contains("\nNorth,0,0,2,2,1,50.0,1,50.0,0,"));
    assert!(env.root.join("docs/index.html").exists());
}

#[test]
fn directories_can_be_overridden() {
    let env = CliEnv::new();
    fs::create_dir_all(env.root.join("in")).unwrap();
    fs::write(env.root.join("in/south.csv"), "Session\nS1\n").unwrap();

    env.session_metrics()
        .args(["--data-dir", "in", "--out-dir", "out"])
        .assert()
        .success();

    assert!(env.root.join("out/aggregated_metrics.csv").exists());
    assert!(!env.root.join("docs").exists());
}

#[test]
fn missing_config_file_fails() {
    let env = CliEnv::new();

    env.session_metrics()
        .args(["--config", "absent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}
