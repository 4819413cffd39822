//! Per-task iteration: topological order and changed-file accumulation.

use crate::prelude::*;
use fm_engine::WorkflowContext;
use serde_json::json;
use std::path::PathBuf;

const WORKFLOW: &str = r#"
defaults:
  agent: implementer
phases:
  - name: execute
    type: per-task
    source: analysis.tasks
    steps:
      - name: implement
        prompt: implement-task
        output: implementation
"#;

fn seeded_context() -> WorkflowContext {
    let ctx = WorkflowContext::new();
    ctx.set("specPath", json!("specs/feature.md"));
    // Declaration order is B-then-A; dependencies force A first
    ctx.set(
        "analysis",
        json!({"tasks": [
            {"id": "B", "dependencies": ["A"]},
            {"id": "A", "dependencies": []},
        ]}),
    );
    ctx
}

#[tokio::test]
async fn tasks_run_in_dependency_order() {
    let project = Project::new();
    with_standard_docs(&project);
    project.plugin_file("workflows/execute.yaml", WORKFLOW);
    let fx = project.engine();

    fx.dispatcher
        .push_success(json!({"filesChanged": [{"path": "src/a.rs"}]}));
    fx.dispatcher
        .push_success(json!({"filesChanged": [{"path": "src/b.rs"}]}));

    let def = fm_workflow::WorkflowDef::parse(WORKFLOW, &PathBuf::from("execute.yaml")).unwrap();
    let result = fx
        .engine
        .run_definition(&def, &project.plugin_root(), "execute", seeded_context())
        .await
        .unwrap();

    assert!(result.is_completed());

    // A's prompt rendered before B's
    let calls = fx.dispatcher.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].prompt.contains(r#""id":"A""#), "got: {}", calls[0].prompt);
    assert!(calls[1].prompt.contains(r#""id":"B""#), "got: {}", calls[1].prompt);

    // Parent changed files are the union of both task runs
    assert_eq!(result.changed_files, vec!["src/a.rs", "src/b.rs"]);

    // Progress bookkeeping reflects both completions
    assert_eq!(result.outputs["tasksCompleted"], json!(["A", "B"]));
    assert_eq!(result.outputs["tasksPending"], json!([]));

    // First task's output wins the parent slot (non-clobbering merge)
    assert_eq!(
        result.outputs["implementation"],
        json!({"filesChanged": [{"path": "src/a.rs"}]})
    );
}

#[tokio::test]
async fn task_index_and_total_are_visible_to_prompts() {
    let project = Project::new();
    with_standard_docs(&project);
    project.plugin_file(
        "prompts/implement-task.md",
        "Task {{taskIndex}} of {{taskTotal}}: {{task}}\n",
    );
    let fx = project.engine();

    let def = fm_workflow::WorkflowDef::parse(WORKFLOW, &PathBuf::from("execute.yaml")).unwrap();
    fx.engine
        .run_definition(&def, &project.plugin_root(), "execute", seeded_context())
        .await
        .unwrap();

    let calls = fx.dispatcher.calls();
    assert!(calls[0].prompt.starts_with("Task 0 of 2"), "got: {}", calls[0].prompt);
    assert!(calls[1].prompt.starts_with("Task 1 of 2"), "got: {}", calls[1].prompt);
}
