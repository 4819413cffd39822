//! failWhen: post-step conditions fail the run fast.

use crate::prelude::*;
use fm_core::AuditStatus;
use serde_json::json;
use std::path::PathBuf;

const WORKFLOW: &str = r#"
defaults:
  agent: implementer
phases:
  - name: verify
    prompt: review-changes
    output: verification
    failWhen: "verification.testSuite.exitCode != 0"
  - name: publish
    prompt: implement-task
    output: publishReport
"#;

#[tokio::test]
async fn failing_verification_fails_the_run() {
    let project = Project::new();
    with_standard_docs(&project);
    project.plugin_file("workflows/verify.yaml", WORKFLOW);
    let fx = project.engine();

    fx.dispatcher
        .push_success(json!({"testSuite": {"exitCode": 1}}));

    let result = fx
        .engine
        .run("verify", &PathBuf::from("specs/feature.md"))
        .await
        .unwrap();

    assert!(result.is_failed());
    let error = result.error.as_deref().unwrap();
    assert!(error.contains("verify"), "got: {error}");
    assert!(
        error.contains("verification.testSuite.exitCode != 0"),
        "got: {error}"
    );

    // The failing phase is not completed, and nothing after it ran
    assert!(result.completed_phases.is_empty());
    assert!(fx.sink.entries_for("publish").is_empty());
    assert_eq!(
        fx.sink.statuses_for("verify"),
        vec![AuditStatus::Started, AuditStatus::Failed]
    );

    // Outputs survive for postmortems
    assert_eq!(result.outputs["verification"]["testSuite"]["exitCode"], json!(1));
}

#[tokio::test]
async fn clean_verification_continues() {
    let project = Project::new();
    with_standard_docs(&project);
    project.plugin_file("workflows/verify.yaml", WORKFLOW);
    let fx = project.engine();

    fx.dispatcher
        .push_success(json!({"testSuite": {"exitCode": 0}}));
    fx.dispatcher.push_success(json!({"published": true}));

    let result = fx
        .engine
        .run("verify", &PathBuf::from("specs/feature.md"))
        .await
        .unwrap();

    assert!(result.is_completed());
    assert_eq!(result.completed_phases, vec!["verify", "publish"]);
}
