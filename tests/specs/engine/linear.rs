//! Linear pipeline: structured outputs flow between phases.

use crate::prelude::*;
use async_trait::async_trait;
use fm_core::AuditStatus;
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
  - name: plan
    type: code
    handler: create-issues
    input: analysis
"#;

/// Scenario stub for the issue creator: reads its input and records how
/// many tasks it saw.
struct PlanFromAnalysis;

#[async_trait]
impl Handler for PlanFromAnalysis {
    async fn call(
        &self,
        ctx: &WorkflowContext,
        input: Option<Value>,
        _deps: &HandlerDeps<'_>,
    ) -> Result<(), EngineError> {
        let tasks = input
            .as_ref()
            .and_then(|v| v.get("tasks"))
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        ctx.set("plan", json!({"created": tasks}));
        Ok(())
    }
}

#[tokio::test]
async fn linear_pipeline_with_structured_outputs() {
    let project = Project::new();
    with_standard_docs(&project);
    project.plugin_file("workflows/implement.yaml", WORKFLOW);

    let mut registry = HandlerRegistry::with_builtins();
    registry.register("create-issues", Arc::new(PlanFromAnalysis));
    let fx = project.engine_with(project.config(), registry);

    fx.dispatcher.push_success(json!({"tasks": [{"id": "T1", "dependencies": []}]}));

    let result = fx
        .engine
        .run("implement", &PathBuf::from("specs/feature.md"))
        .await
        .unwrap();

    assert!(result.is_completed());
    assert_eq!(result.completed_phases, vec!["analyze", "plan"]);
    assert_eq!(result.outputs["analysis"]["tasks"].as_array().unwrap().len(), 1);
    assert_eq!(result.outputs["plan"]["created"], json!(1));

    // One started/completed pair per phase, in order
    assert_eq!(
        fx.sink.statuses_for("analyze"),
        vec![AuditStatus::Started, AuditStatus::Completed]
    );
    assert_eq!(
        fx.sink.statuses_for("plan"),
        vec![AuditStatus::Started, AuditStatus::Completed]
    );

    // The analyze dispatch carried the agent document's contract
    let calls = fx.dispatcher.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].has_output_schema);
    assert!(calls[0].prompt.contains("specs/feature.md"));
    assert!(calls[0]
        .system_prompt
        .as_deref()
        .unwrap()
        .contains("decompose specifications"));
    assert_eq!(
        calls[0].allowed_tools,
        Some(vec!["Read".to_string(), "Grep".to_string()])
    );
}

#[tokio::test]
async fn composed_step_completion_entry_names_resolved_documents() {
    let project = Project::new();
    with_standard_docs(&project);
    project.plugin_file("workflows/implement.yaml", WORKFLOW);

    let mut registry = HandlerRegistry::with_builtins();
    registry.register("create-issues", Arc::new(PlanFromAnalysis));
    let fx = project.engine_with(project.config(), registry);

    fx.dispatcher.push_success(json!({"tasks": []}));
    fx.engine
        .run("implement", &PathBuf::from("spec.md"))
        .await
        .unwrap();

    let entries = fx.sink.entries_for("analyze");
    let metadata = entries[1].metadata.as_ref().unwrap();
    assert!(metadata["agent"].as_str().unwrap().contains("analyst.md"));
    assert!(metadata["prompt"].as_str().unwrap().contains("analyze-spec.md"));
    assert_eq!(metadata["agentSource"], json!("builtin"));
}

#[tokio::test]
async fn project_documents_override_builtins() {
    let project = Project::new();
    with_standard_docs(&project);
    project.plugin_file("workflows/implement.yaml", WORKFLOW);
    // Project tier shadows the builtin prompt
    project.project_file(
        ".foreman/prompts/analyze-spec.md",
        "Project-specific analysis of {{specPath}}.\n",
    );

    let mut registry = HandlerRegistry::with_builtins();
    registry.register("create-issues", Arc::new(PlanFromAnalysis));
    let fx = project.engine_with(project.config(), registry);

    fx.dispatcher.push_success(json!({"tasks": []}));
    fx.engine
        .run("implement", &PathBuf::from("spec.md"))
        .await
        .unwrap();

    let calls = fx.dispatcher.calls();
    assert!(calls[0].prompt.contains("Project-specific analysis"));
}
