//! Checkpoint and resume: paused runs continue without re-running work.

use crate::prelude::*;
use async_trait::async_trait;
use fm_engine::{EngineError, Handler, HandlerDeps, HandlerRegistry, WorkflowContext};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

const WORKFLOW: &str = r#"
defaults:
  agent: analyst
phases:
  - name: analyze
    prompt: analyze-spec
    output: analysis
  - name: gate
    type: code
    handler: request-pause
  - name: plan
    type: code
    handler: plan-stub
"#;

/// Intentional blocker, as a governance gate would raise.
struct RequestPause;

#[async_trait]
impl Handler for RequestPause {
    async fn call(
        &self,
        _ctx: &WorkflowContext,
        _input: Option<Value>,
        _deps: &HandlerDeps<'_>,
    ) -> Result<(), EngineError> {
        Err(EngineError::Paused {
            step: "gate".to_string(),
            details: "awaiting operator approval".to_string(),
        })
    }
}

/// Records what the analysis looked like when the plan phase observed it.
struct PlanStub;

#[async_trait]
impl Handler for PlanStub {
    async fn call(
        &self,
        ctx: &WorkflowContext,
        _input: Option<Value>,
        _deps: &HandlerDeps<'_>,
    ) -> Result<(), EngineError> {
        let first_task = ctx.resolve("analysis.tasks").and_then(|tasks| {
            tasks
                .as_array()
                .and_then(|a| a.first())
                .and_then(|t| t.get("id"))
                .cloned()
        });
        ctx.set("plan", json!({"observedTask": first_task}));
        Ok(())
    }
}

fn registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::with_builtins();
    registry.register("request-pause", Arc::new(RequestPause));
    registry.register("plan-stub", Arc::new(PlanStub));
    registry
}

#[tokio::test]
async fn paused_run_resumes_without_rerunning_completed_phases() {
    let project = Project::new();
    with_standard_docs(&project);
    project.plugin_file("workflows/gated.yaml", WORKFLOW);

    // First run: analyze completes, the gate pauses
    let fx = project.engine_with(project.config(), registry());
    fx.dispatcher
        .push_success(json!({"tasks": [{"id": "T1", "dependencies": []}]}));

    let paused = fx
        .engine
        .run("gated", &PathBuf::from("specs/feature.md"))
        .await
        .unwrap();

    assert!(paused.is_paused());
    assert_eq!(paused.completed_phases, vec!["analyze"]);
    assert_eq!(paused.paused_at_phase.as_deref(), Some("gate"));
    assert_eq!(
        paused.blocker_details.as_deref(),
        Some("awaiting operator approval")
    );

    let checkpoint = fx.sink.last_checkpoint().unwrap();
    assert!(checkpoint.variables.contains_key("analysis"));
    assert_eq!(checkpoint.completed_phases, vec!["analyze"]);

    // Resume with a fresh engine sharing the sink (same run id): the
    // operator approved, so continue at plan
    let resumed_engine = fm_engine::Engine::new(
        fx.dispatcher.clone(),
        fx.sink.clone(),
        project.config(),
    )
    .with_resolver(project.resolver())
    .with_registry(registry())
    .with_run_id(fm_core::RunId::new("run-1"));

    let dispatches_before = fx.dispatcher.call_count();
    let resumed = resumed_engine.resume("plan").await.unwrap();

    assert!(resumed.is_completed());
    // analyze inherited from the checkpoint, never re-executed
    assert_eq!(resumed.completed_phases, vec!["analyze", "plan"]);
    assert_eq!(fx.dispatcher.call_count(), dispatches_before);
    assert!(fx.sink.entries_for("analyze").len() == 2); // from the first run only

    // plan observed the checkpointed analysis unchanged
    assert_eq!(resumed.outputs["plan"]["observedTask"], json!("T1"));
}

#[tokio::test]
async fn interrupted_run_matches_an_uninterrupted_one() {
    // Uninterrupted baseline: same workflow without the gate
    let baseline_project = Project::new();
    with_standard_docs(&baseline_project);
    baseline_project.plugin_file(
        "workflows/gated.yaml",
        &WORKFLOW.replace("  - name: gate\n    type: code\n    handler: request-pause\n", ""),
    );
    let baseline = baseline_project.engine_with(baseline_project.config(), registry());
    baseline
        .dispatcher
        .push_success(json!({"tasks": [{"id": "T1", "dependencies": []}]}));
    let expected = baseline
        .engine
        .run("gated", &PathBuf::from("specs/feature.md"))
        .await
        .unwrap();

    // Interrupted run: pause at the gate, then resume at plan
    let project = Project::new();
    with_standard_docs(&project);
    project.plugin_file("workflows/gated.yaml", WORKFLOW);
    let fx = project.engine_with(project.config(), registry());
    fx.dispatcher
        .push_success(json!({"tasks": [{"id": "T1", "dependencies": []}]}));
    fx.engine
        .run("gated", &PathBuf::from("specs/feature.md"))
        .await
        .unwrap();
    let resumed = fm_engine::Engine::new(fx.dispatcher.clone(), fx.sink.clone(), project.config())
        .with_resolver(project.resolver())
        .with_registry(registry())
        .with_run_id(fm_core::RunId::new("run-1"))
        .resume("plan")
        .await
        .unwrap();

    assert_eq!(resumed.outputs["analysis"], expected.outputs["analysis"]);
    assert_eq!(resumed.outputs["plan"], expected.outputs["plan"]);
    assert_eq!(resumed.changed_files, expected.changed_files);
    assert_eq!(resumed.completed_phases, expected.completed_phases);
}
