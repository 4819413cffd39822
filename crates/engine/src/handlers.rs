// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler registry for code steps
//!
//! Code steps invoke named handlers: async functions that receive the
//! context, an optional resolved input value, and the run's dependencies
//! (dispatcher, sink, config). Handlers may freely mutate the context.

use crate::config::RunConfig;
use crate::context::WorkflowContext;
use crate::error::EngineError;
use async_trait::async_trait;
use fm_adapters::AgentDispatcher;
use fm_core::{RunId, Task};
use fm_storage::SessionSink;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Dependencies exposed to handlers.
pub struct HandlerDeps<'a> {
    pub dispatcher: &'a dyn AgentDispatcher,
    pub sink: &'a dyn SessionSink,
    pub config: &'a RunConfig,
    pub run_id: &'a RunId,
    pub workflow: &'a str,
}

/// A registered code-step handler.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(
        &self,
        ctx: &WorkflowContext,
        input: Option<Value>,
        deps: &HandlerDeps<'_>,
    ) -> Result<(), EngineError>;
}

/// Name-keyed dispatch table for code steps.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the handlers the builtin workflow
    /// definitions reference.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("save-checkpoint", Arc::new(SaveCheckpoint));
        registry.register("create-issues", Arc::new(CreateIssues));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn Handler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Handler>, EngineError> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownHandler(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Snapshot the current context through the sink, mid-workflow.
struct SaveCheckpoint;

#[async_trait]
impl Handler for SaveCheckpoint {
    async fn call(
        &self,
        ctx: &WorkflowContext,
        _input: Option<Value>,
        deps: &HandlerDeps<'_>,
    ) -> Result<(), EngineError> {
        let checkpoint = ctx.to_checkpoint(deps.run_id, deps.workflow);
        deps.sink.save_checkpoint(&checkpoint).await?;
        Ok(())
    }
}

/// Materialize the task list from the input as markdown issue stubs under
/// `<project>/.foreman/issues/`, recording `{created}` under `issues`.
struct CreateIssues;

#[async_trait]
impl Handler for CreateIssues {
    async fn call(
        &self,
        ctx: &WorkflowContext,
        input: Option<Value>,
        deps: &HandlerDeps<'_>,
    ) -> Result<(), EngineError> {
        let tasks = tasks_from_input(input)
            .ok_or_else(|| EngineError::Handler("create-issues: input has no tasks".to_string()))?;

        let dir = deps.config.project_root.join(".foreman").join("issues");
        std::fs::create_dir_all(&dir)
            .map_err(|e| EngineError::Handler(format!("create-issues: {e}")))?;

        for task in &tasks {
            let title = task
                .extra
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(task.id.as_str());
            let description = task
                .extra
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("");
            let body = format!(
                "# {title}\n\nid: {}\ndependencies: {}\n\n{description}\n",
                task.id,
                if task.dependencies.is_empty() {
                    "none".to_string()
                } else {
                    task.dependencies.join(", ")
                }
            );
            std::fs::write(dir.join(format!("{}.md", task.id)), body)
                .map_err(|e| EngineError::Handler(format!("create-issues: {e}")))?;
        }

        ctx.set("issues", json!({"created": tasks.len()}));
        tracing::info!(count = tasks.len(), dir = %dir.display(), "issue stubs created");
        Ok(())
    }
}

/// Accepts either a bare task array or an analysis object with a `tasks`
/// field.
fn tasks_from_input(input: Option<Value>) -> Option<Vec<Task>> {
    let value = input?;
    let array = match value {
        Value::Array(_) => value,
        Value::Object(ref map) => map.get("tasks")?.clone(),
        _ => return None,
    };
    serde_json::from_value(array).ok()
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
