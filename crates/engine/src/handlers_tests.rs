// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_adapters::FakeDispatcher;
use fm_storage::MemorySessionSink;
use serde_json::json;
use tempfile::TempDir;

struct SetFlag;

#[async_trait]
impl Handler for SetFlag {
    async fn call(
        &self,
        ctx: &WorkflowContext,
        input: Option<Value>,
        _deps: &HandlerDeps<'_>,
    ) -> Result<(), EngineError> {
        ctx.set("flag", input.unwrap_or(Value::Null));
        Ok(())
    }
}

fn deps<'a>(
    dispatcher: &'a FakeDispatcher,
    sink: &'a MemorySessionSink,
    config: &'a RunConfig,
    run_id: &'a RunId,
) -> HandlerDeps<'a> {
    HandlerDeps {
        dispatcher,
        sink,
        config,
        run_id,
        workflow: "implement",
    }
}

#[test]
fn builtins_are_registered() {
    let registry = HandlerRegistry::with_builtins();
    assert!(registry.has("save-checkpoint"));
    assert!(registry.has("create-issues"));
    assert_eq!(registry.list(), vec!["create-issues", "save-checkpoint"]);
}

#[test]
fn unknown_handler_raises() {
    let registry = HandlerRegistry::new();
    let result = registry.get("nope");
    assert!(matches!(result, Err(EngineError::UnknownHandler(_))));
}

#[tokio::test]
async fn custom_handlers_mutate_the_context() {
    let mut registry = HandlerRegistry::new();
    registry.register("set-flag", Arc::new(SetFlag));

    let dispatcher = FakeDispatcher::new();
    let sink = MemorySessionSink::new();
    let config = RunConfig::default();
    let run_id = RunId::new("run-1");
    let ctx = WorkflowContext::new();

    registry
        .get("set-flag")
        .unwrap()
        .call(&ctx, Some(json!(7)), &deps(&dispatcher, &sink, &config, &run_id))
        .await
        .unwrap();
    assert_eq!(ctx.get("flag"), Some(json!(7)));
}

#[tokio::test]
async fn save_checkpoint_snapshots_through_the_sink() {
    let registry = HandlerRegistry::with_builtins();
    let dispatcher = FakeDispatcher::new();
    let sink = MemorySessionSink::new();
    let config = RunConfig::default();
    let run_id = RunId::new("run-7");

    let ctx = WorkflowContext::new();
    ctx.set("analysis", json!({"tasks": []}));
    ctx.set_current_phase("plan");

    registry
        .get("save-checkpoint")
        .unwrap()
        .call(&ctx, None, &deps(&dispatcher, &sink, &config, &run_id))
        .await
        .unwrap();

    let checkpoint = sink.last_checkpoint().unwrap();
    assert_eq!(checkpoint.run_id, "run-7");
    assert_eq!(checkpoint.workflow, "implement");
    assert_eq!(checkpoint.current_phase.as_deref(), Some("plan"));
    assert!(checkpoint.variables.contains_key("analysis"));
}

#[tokio::test]
async fn create_issues_writes_stubs_and_records_count() {
    let project = TempDir::new().unwrap();
    let registry = HandlerRegistry::with_builtins();
    let dispatcher = FakeDispatcher::new();
    let sink = MemorySessionSink::new();
    let config = RunConfig {
        project_root: project.path().to_path_buf(),
        ..RunConfig::default()
    };
    let run_id = RunId::new("run-1");
    let ctx = WorkflowContext::new();

    let input = json!({
        "tasks": [
            {"id": "T1", "dependencies": [], "title": "Parse config", "description": "Load YAML."},
            {"id": "T2", "dependencies": ["T1"]},
        ]
    });
    registry
        .get("create-issues")
        .unwrap()
        .call(&ctx, Some(input), &deps(&dispatcher, &sink, &config, &run_id))
        .await
        .unwrap();

    assert_eq!(ctx.get("issues"), Some(json!({"created": 2})));
    let t1 = std::fs::read_to_string(project.path().join(".foreman/issues/T1.md")).unwrap();
    assert!(t1.contains("# Parse config"));
    assert!(t1.contains("Load YAML."));
    let t2 = std::fs::read_to_string(project.path().join(".foreman/issues/T2.md")).unwrap();
    assert!(t2.contains("dependencies: T1"));
}

#[tokio::test]
async fn create_issues_without_tasks_is_a_handler_error() {
    let registry = HandlerRegistry::with_builtins();
    let dispatcher = FakeDispatcher::new();
    let sink = MemorySessionSink::new();
    let config = RunConfig::default();
    let run_id = RunId::new("run-1");
    let ctx = WorkflowContext::new();

    let err = registry
        .get("create-issues")
        .unwrap()
        .call(
            &ctx,
            Some(json!("not tasks")),
            &deps(&dispatcher, &sink, &config, &run_id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Handler(_)));
}
