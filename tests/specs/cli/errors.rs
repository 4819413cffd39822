//! CLI error handling specs (black-box; skipped when fm is not built).

use crate::prelude::*;
use tempfile::TempDir;

fn roots() -> (TempDir, TempDir) {
    (TempDir::new().unwrap(), TempDir::new().unwrap())
}

#[test]
fn run_without_spec_flag_is_a_usage_error() {
    let Some(mut cmd) = fm_cmd() else {
        eprintln!("fm binary not built; skipping");
        return;
    };
    let assert = cmd.args(["run", "implement"]).assert().failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("--spec"), "got: {stderr}");
}

#[test]
fn validate_unknown_workflow_lists_candidates() {
    let Some(mut cmd) = fm_cmd() else {
        eprintln!("fm binary not built; skipping");
        return;
    };
    let (project, plugin) = roots();
    let assert = cmd
        .args(["validate", "nonexistent"])
        .arg("--project-root")
        .arg(project.path())
        .arg("--plugin-root")
        .arg(plugin.path())
        .assert()
        .failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("nonexistent"), "got: {stderr}");
    assert!(stderr.contains("not found"), "got: {stderr}");
}

#[test]
fn resume_without_checkpoint_reports_it() {
    let Some(mut cmd) = fm_cmd() else {
        eprintln!("fm binary not built; skipping");
        return;
    };
    let (project, plugin) = roots();
    let assert = cmd
        .args(["resume", "--checkpoint", "no-such-run", "--phase", "plan"])
        .arg("--project-root")
        .arg(project.path())
        .arg("--plugin-root")
        .arg(plugin.path())
        .assert()
        .failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("no checkpoint"), "got: {stderr}");
}

#[test]
fn workflows_on_an_empty_project_says_so() {
    let Some(mut cmd) = fm_cmd() else {
        eprintln!("fm binary not built; skipping");
        return;
    };
    let (project, plugin) = roots();
    let assert = cmd
        .arg("workflows")
        .arg("--project-root")
        .arg(project.path())
        .arg("--plugin-root")
        .arg(plugin.path())
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("no workflows found"), "got: {stdout}");
}
