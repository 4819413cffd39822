//! Skip policy: --skip-checks and --skip-step.

use crate::prelude::*;
use fm_core::AuditStatus;
use fm_engine::{HandlerRegistry, RunConfig};
use serde_json::json;
use std::path::PathBuf;

const WORKFLOW: &str = r#"
defaults:
  agent: implementer
phases:
  - name: plan
    type: code
    handler: save-checkpoint
  - name: code-review
    prompt: review-changes
    output: review
  - name: publish
    prompt: implement-task
    output: publishReport
"#;

fn project_with_workflow() -> Project {
    let project = Project::new();
    with_standard_docs(&project);
    project.plugin_file("workflows/ship.yaml", WORKFLOW);
    project
}

#[tokio::test]
async fn skip_checks_skips_review_phases_but_not_the_rest() {
    let project = project_with_workflow();
    let fx = project.engine_with(
        RunConfig {
            skip_checks: true,
            ..project.config()
        },
        HandlerRegistry::with_builtins(),
    );

    let result = fx
        .engine
        .run("ship", &PathBuf::from("specs/feature.md"))
        .await
        .unwrap();

    assert!(result.is_completed());
    // The skipped phase is omitted from completedPhases
    assert_eq!(result.completed_phases, vec!["plan", "publish"]);

    let entries = fx.sink.entries_for("code-review");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, AuditStatus::Skipped);
    assert_eq!(entries[0].metadata, Some(json!({"reason": "--skip-checks"})));

    // publish still dispatched; the reviewer never did
    assert_eq!(fx.dispatcher.call_count(), 1);
}

#[tokio::test]
async fn skip_step_skips_by_exact_name() {
    let project = project_with_workflow();
    let fx = project.engine_with(
        RunConfig {
            skip_step_names: vec!["plan".to_string()],
            ..project.config()
        },
        HandlerRegistry::with_builtins(),
    );

    let result = fx
        .engine
        .run("ship", &PathBuf::from("specs/feature.md"))
        .await
        .unwrap();

    assert!(result.is_completed());
    assert_eq!(result.completed_phases, vec!["code-review", "publish"]);

    let entries = fx.sink.entries_for("plan");
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].metadata,
        Some(json!({"reason": "--skip-step=plan"}))
    );
}

#[tokio::test]
async fn disabled_phase_reports_its_reason() {
    let project = Project::new();
    with_standard_docs(&project);
    project.plugin_file(
        "workflows/ship.yaml",
        &WORKFLOW.replace(
            "  - name: code-review\n",
            "  - name: code-review\n    enabled: false\n",
        ),
    );
    let fx = project.engine();

    fx.engine
        .run("ship", &PathBuf::from("specs/feature.md"))
        .await
        .unwrap();

    let entries = fx.sink.entries_for("code-review");
    assert_eq!(
        entries[0].metadata,
        Some(json!({"reason": "disabled in workflow definition"}))
    );
}
