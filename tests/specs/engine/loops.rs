//! Review/fix loops: retry bounds and exhaustion policies.

use crate::prelude::*;
use fm_adapters::ScriptedResponse;
use serde_json::json;
use std::path::PathBuf;

const WORKFLOW: &str = r#"
defaults:
  agent: reviewer
phases:
  - name: review-phase
    type: loop
    condition: "review.hasActionableIssues"
    maxRetries: 2
    steps:
      - name: run-review
        prompt: review-changes
        output: review
"#;

#[tokio::test]
async fn exhausted_loop_escalates_to_a_paused_run() {
    let project = Project::new();
    with_standard_docs(&project);
    project.plugin_file("workflows/review.yaml", WORKFLOW);
    let fx = project.engine();

    // The reviewer finds actionable issues on every call
    fx.dispatcher.set_default_response(ScriptedResponse::Success(
        json!({"hasActionableIssues": true, "issues": [{"description": "unhandled error"}]}),
    ));

    let result = fx
        .engine
        .run("review", &PathBuf::from("specs/feature.md"))
        .await
        .unwrap();

    assert!(result.is_paused());
    assert_eq!(result.paused_at_phase.as_deref(), Some("review-phase"));
    let blocker = result.blocker_details.as_deref().unwrap();
    assert!(blocker.contains("Loop exhausted 2 retries"), "got: {blocker}");
    assert!(blocker.contains("review.hasActionableIssues"), "got: {blocker}");

    // Exactly two iterations of the nested step ran
    assert_eq!(fx.dispatcher.call_count(), 2);

    // The checkpoint was durable before the paused result, with task
    // bookkeeping fields present
    let checkpoint = fx.sink.last_checkpoint().unwrap();
    assert_eq!(checkpoint.current_phase.as_deref(), Some("review-phase"));
    assert!(checkpoint.variables.contains_key("review"));
    assert!(checkpoint.tasks_completed.is_empty());
    assert!(checkpoint.tasks_pending.is_empty());

    // And the blocker was persisted
    assert_eq!(fx.sink.blockers().len(), 1);
}

#[tokio::test]
async fn loop_ends_quietly_once_the_condition_clears() {
    let project = Project::new();
    with_standard_docs(&project);
    project.plugin_file("workflows/review.yaml", WORKFLOW);
    let fx = project.engine();

    fx.dispatcher.push_success(json!({"hasActionableIssues": true}));
    fx.dispatcher.push_success(json!({"hasActionableIssues": false}));

    let result = fx
        .engine
        .run("review", &PathBuf::from("specs/feature.md"))
        .await
        .unwrap();

    assert!(result.is_completed());
    assert_eq!(result.completed_phases, vec!["review-phase"]);
    assert_eq!(fx.dispatcher.call_count(), 2);
    assert!(fx.sink.blockers().is_empty());
}

#[tokio::test]
async fn fail_policy_turns_exhaustion_into_a_failed_run() {
    let project = Project::new();
    with_standard_docs(&project);
    project.plugin_file(
        "workflows/review.yaml",
        &WORKFLOW.replace("maxRetries: 2", "maxRetries: 2\n    onExhausted: fail"),
    );
    let fx = project.engine();
    fx.dispatcher.set_default_response(ScriptedResponse::Success(
        json!({"hasActionableIssues": true}),
    ));

    let result = fx
        .engine
        .run("review", &PathBuf::from("specs/feature.md"))
        .await
        .unwrap();

    assert!(result.is_failed());
    let error = result.error.as_deref().unwrap();
    assert!(error.contains("review-phase"), "got: {error}");
    assert!(error.contains("Loop exhausted 2 retries"), "got: {error}");
}

#[tokio::test]
async fn warn_policy_records_a_warning_and_continues() {
    let project = Project::new();
    with_standard_docs(&project);
    project.plugin_file(
        "workflows/review.yaml",
        &WORKFLOW.replace("maxRetries: 2", "maxRetries: 1\n    onExhausted: warn"),
    );
    let fx = project.engine();
    fx.dispatcher.set_default_response(ScriptedResponse::Success(
        json!({"hasActionableIssues": true}),
    ));

    let result = fx
        .engine
        .run("review", &PathBuf::from("specs/feature.md"))
        .await
        .unwrap();

    assert!(result.is_completed());
    let entries = fx.sink.entries_for("review-phase");
    let metadata = entries.last().unwrap().metadata.as_ref().unwrap();
    assert!(metadata["warning"]
        .as_str()
        .unwrap()
        .contains("Loop exhausted 1 retries"));
}
