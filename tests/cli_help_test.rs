// Binary-level checks: help text, threshold table, replay exit codes

use assert_cmd::Command;
use predicates::prelude::*;

fn borehole_workflow() -> Command {
    let mut cmd = Command::cargo_bin("borehole-workflow").unwrap();
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"))
        .env("RUST_LOG", "error");
    cmd
}

#[test]
fn test_no_subcommand_prints_usage() {
    borehole_workflow()
        .assert()
        .success()
        .stdout(predicate::str::contains("replay"))
        .stdout(predicate::str::contains("thresholds"))
        .stdout(predicate::str::contains("init-config"));
}

#[test]
fn test_thresholds_lists_default_roles() {
    borehole_workflow()
        .arg("thresholds")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reviewed -> Published"))
        .stdout(predicate::str::contains("Publisher"))
        .stdout(predicate::str::contains("10 minutes"));
}

#[test]
fn test_thresholds_follow_environment_overrides() {
    borehole_workflow()
        .env("BOREHOLE_WORKFLOW_WORKFLOW__LOCK_TIMEOUT_MINUTES", "25")
        .arg("thresholds")
        .assert()
        .success()
        .stdout(predicate::str::contains("25 minutes"));
}

#[test]
fn test_replay_prints_final_state() {
    borehole_workflow()
        .args(["replay", "demos/review-cycle.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("COMMENT_REQUIRED"))
        .stdout(predicate::str::contains("borehole 1001: Published"));
}

#[test]
fn test_strict_replay_exits_with_error_code() {
    borehole_workflow()
        .args(["replay", "demos/review-cycle.toml", "--strict"])
        .assert()
        .code(11)
        .stdout(predicate::str::contains("INSUFFICIENT_PRIVILEGE"));
}

#[test]
fn test_metrics_summary_follows_config() {
    borehole_workflow()
        .env("RUST_LOG", "info")
        .args(["replay", "demos/review-cycle.toml"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Workflow metrics"));

    borehole_workflow()
        .env("RUST_LOG", "info")
        .env("BOREHOLE_WORKFLOW_OBSERVABILITY__METRICS_ENABLED", "false")
        .args(["replay", "demos/review-cycle.toml"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Workflow metrics").not());
}

#[test]
fn test_invalid_lock_timeout_is_refused_at_startup() {
    borehole_workflow()
        .env("BOREHOLE_WORKFLOW_WORKFLOW__LOCK_TIMEOUT_MINUTES", "-1")
        .arg("thresholds")
        .assert()
        .failure()
        .stderr(predicate::str::contains("lock_timeout_minutes"));
}

#[test]
fn test_init_config_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("borehole-workflow.toml");

    borehole_workflow()
        .args(["init-config", "--path"])
        .arg(&path)
        .assert()
        .success();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("lock_timeout_minutes = 10"));
    assert!(written.contains("[workflow.thresholds]"));
}
