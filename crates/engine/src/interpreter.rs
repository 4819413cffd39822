// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step interpreter
//!
//! Recursive async executor over the step tree. Every step follows the
//! same entry sequence: compute a skip reason (one `skipped` audit entry
//! and done), else emit `started`, execute by kind, and emit `completed`
//! or `failed`. Control signals (`Paused`, `Failed`) propagate upward to
//! run orchestration.

use crate::config::ActiveDefaults;
use crate::context::WorkflowContext;
use crate::error::EngineError;
use crate::handlers::HandlerDeps;
use crate::runner::Engine;
use crate::toposort;
use fm_adapters::{collect_result, AgentDispatcher, DispatchOptions, DispatchRequest};
use fm_core::{AuditEntry, Task};
use fm_storage::SessionSink;
use fm_workflow::step::{
    AgentStepDef, CodeStepDef, LegacyAgentStepDef, LoopStepDef, OnExhausted, ParallelStepDef,
    PerTaskStepDef, StepDef, StepInput,
};
use fm_workflow::{
    document::{AgentDoc, LegacyAgentDoc, PromptDoc},
    resolver, template, DocKind, LoadError,
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Whether a step actually executed. Skipped phases stay out of
/// `completedPhases`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    Ran,
    Skipped,
}

/// Per-run interpreter state: installed defaults, the workflow's base
/// directory for legacy agent paths, and document caches (documents are
/// immutable for the run's lifetime).
pub(crate) struct RunFrame {
    pub defaults: ActiveDefaults,
    pub base_dir: PathBuf,
    pub workflow: String,
    agent_docs: Mutex<HashMap<PathBuf, Arc<AgentDoc>>>,
    prompt_docs: Mutex<HashMap<PathBuf, Arc<PromptDoc>>>,
    legacy_docs: Mutex<HashMap<PathBuf, Arc<LegacyAgentDoc>>>,
}

impl RunFrame {
    pub fn new(defaults: ActiveDefaults, base_dir: PathBuf, workflow: String) -> Self {
        Self {
            defaults,
            base_dir,
            workflow,
            agent_docs: Mutex::new(HashMap::new()),
            prompt_docs: Mutex::new(HashMap::new()),
            legacy_docs: Mutex::new(HashMap::new()),
        }
    }

    fn agent_doc(&self, path: &Path) -> Result<Arc<AgentDoc>, LoadError> {
        if let Some(doc) = self.agent_docs.lock().get(path) {
            return Ok(Arc::clone(doc));
        }
        let doc = Arc::new(AgentDoc::load(path)?);
        self.agent_docs
            .lock()
            .insert(path.to_path_buf(), Arc::clone(&doc));
        Ok(doc)
    }

    fn prompt_doc(&self, path: &Path) -> Result<Arc<PromptDoc>, LoadError> {
        if let Some(doc) = self.prompt_docs.lock().get(path) {
            return Ok(Arc::clone(doc));
        }
        let doc = Arc::new(PromptDoc::load(path)?);
        self.prompt_docs
            .lock()
            .insert(path.to_path_buf(), Arc::clone(&doc));
        Ok(doc)
    }

    fn legacy_doc(&self, path: &Path) -> Result<Arc<LegacyAgentDoc>, LoadError> {
        if let Some(doc) = self.legacy_docs.lock().get(path) {
            return Ok(Arc::clone(doc));
        }
        let doc = Arc::new(LegacyAgentDoc::load(path)?);
        self.legacy_docs
            .lock()
            .insert(path.to_path_buf(), Arc::clone(&doc));
        Ok(doc)
    }
}

type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<StepOutcome, EngineError>> + Send + 'a>>;

impl<D, S> Engine<D, S>
where
    D: AgentDispatcher,
    S: SessionSink,
{
    /// Execute one step: skip policy, audit bracketing, dispatch by kind.
    pub(crate) fn execute_step<'a>(
        &'a self,
        frame: &'a RunFrame,
        step: &'a StepDef,
        ctx: &'a WorkflowContext,
    ) -> StepFuture<'a> {
        Box::pin(async move {
            if let Some(reason) = self.skip_reason(step) {
                tracing::info!(step = step.name(), %reason, "step skipped");
                self.sink
                    .append_audit_entry(
                        &AuditEntry::skipped(step.name())
                            .with_metadata(json!({ "reason": reason })),
                    )
                    .await?;
                return Ok(StepOutcome::Skipped);
            }

            self.sink
                .append_audit_entry(&AuditEntry::started(step.name()))
                .await?;
            let started = Instant::now();

            match self.execute_kind(frame, step, ctx).await {
                Ok(metadata) => {
                    tracing::info!(
                        step = step.name(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "step completed"
                    );
                    let mut entry = AuditEntry::completed(step.name());
                    if let Some(metadata) = metadata {
                        entry = entry.with_metadata(metadata);
                    }
                    self.sink.append_audit_entry(&entry).await?;
                    Ok(StepOutcome::Ran)
                }
                Err(err) => {
                    tracing::error!(
                        step = step.name(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        error = %err,
                        "step failed"
                    );
                    self.sink
                        .append_audit_entry(
                            &AuditEntry::failed(step.name())
                                .with_metadata(json!({ "error": err.to_string() })),
                        )
                        .await?;
                    Err(err)
                }
            }
        })
    }

    /// Run a sibling list sequentially, in declaration order.
    async fn execute_steps(
        &self,
        frame: &RunFrame,
        steps: &[StepDef],
        ctx: &WorkflowContext,
    ) -> Result<(), EngineError> {
        for step in steps {
            self.execute_step(frame, step, ctx).await?;
        }
        Ok(())
    }

    /// Skip policy, in priority order: disabled, `--skip-step`,
    /// `--skip-checks` for check steps.
    fn skip_reason(&self, step: &StepDef) -> Option<String> {
        if !step.enabled() {
            return Some("disabled in workflow definition".to_string());
        }
        let name = step.name();
        if self.config.skip_step_names.iter().any(|s| s == name) {
            return Some(format!("--skip-step={name}"));
        }
        if self.config.skip_checks && is_check_step(step) {
            return Some("--skip-checks".to_string());
        }
        None
    }

    async fn execute_kind(
        &self,
        frame: &RunFrame,
        step: &StepDef,
        ctx: &WorkflowContext,
    ) -> Result<Option<Value>, EngineError> {
        match step {
            StepDef::Agent(s) => self.run_composed(frame, s, ctx).await,
            StepDef::LegacyAgent(s) => self.run_legacy(frame, s, ctx).await.map(|_| None),
            StepDef::Code(s) => self.run_code(frame, s, ctx).await.map(|_| None),
            StepDef::Parallel(s) => self.run_parallel(frame, s, ctx).await.map(|_| None),
            StepDef::PerTask(s) => self.run_per_task(frame, s, ctx).await.map(|_| None),
            StepDef::Loop(s) => self.run_loop(frame, s, ctx).await,
        }
    }

    /// Composed agent step: resolve agent + prompt by name, render, and
    /// dispatch. The completed audit entry carries the resolved sources.
    async fn run_composed(
        &self,
        frame: &RunFrame,
        step: &AgentStepDef,
        ctx: &WorkflowContext,
    ) -> Result<Option<Value>, EngineError> {
        let resolver = self
            .resolver
            .as_ref()
            .ok_or_else(|| EngineError::ResolverRequired(step.name.clone()))?;
        let agent_name = step
            .agent
            .as_deref()
            .or(frame.defaults.agent.as_deref())
            .ok_or_else(|| EngineError::NoAgent(step.name.clone()))?;

        let agent = resolver.resolve(DocKind::Agents, agent_name)?;
        let agent_doc = frame.agent_doc(&agent.path)?;
        let prompt = resolver.resolve(DocKind::Prompts, &step.prompt)?;
        let prompt_doc = frame.prompt_doc(&prompt.path)?;

        let template_vars = wire_template_vars(ctx, step.input.as_ref());
        let rendered = template::render(&prompt_doc.body, &template_vars);

        let output_schema = agent_doc
            .output_schema
            .as_deref()
            .map(|id| self.schemas.require(id))
            .transpose()?;
        let options = DispatchOptions {
            system_prompt: Some(agent_doc.system_prompt.clone()),
            allowed_tools: agent_doc.tools.clone(),
            output_schema,
            model: step
                .model
                .clone()
                .or_else(|| agent_doc.model.clone())
                .or_else(|| frame.defaults.model.clone()),
            cwd: Some(self.config.working_dir.clone()),
            permission_mode: frame.defaults.permission_mode.clone(),
            mcp_servers: self.config.mcp_servers.clone(),
            setting_sources: frame.defaults.setting_sources.clone(),
        };

        tracing::info!(
            step = %step.name,
            agent = %agent_name,
            model = options.model.as_deref().unwrap_or("default"),
            "dispatching agent"
        );
        let value = self.dispatch(rendered, options).await?;
        self.apply_output(ctx, step.output.as_deref(), value);
        self.check_fail_when(&step.name, step.fail_when.as_deref(), ctx)?;

        Ok(Some(json!({
            "agent": agent.path.display().to_string(),
            "agentSource": agent.source,
            "prompt": prompt.path.display().to_string(),
            "promptSource": prompt.source,
        })))
    }

    /// Legacy agent step: one markdown file under the workflow's base
    /// directory; the body is the template, no separate system prompt.
    async fn run_legacy(
        &self,
        frame: &RunFrame,
        step: &LegacyAgentStepDef,
        ctx: &WorkflowContext,
    ) -> Result<(), EngineError> {
        let path = resolver::resolve_under_base(&frame.base_dir, &step.agent_path)?;
        let doc = frame.legacy_doc(&path)?;

        let template_vars = wire_template_vars(ctx, step.input.as_ref());
        let rendered = template::render(&doc.prompt, &template_vars);

        let output_schema = doc
            .output_schema
            .as_deref()
            .map(|id| self.schemas.require(id))
            .transpose()?;
        let options = DispatchOptions {
            system_prompt: None,
            allowed_tools: doc.tools.clone(),
            output_schema,
            model: step
                .model
                .clone()
                .or_else(|| doc.model.clone())
                .or_else(|| frame.defaults.model.clone()),
            cwd: Some(self.config.working_dir.clone()),
            permission_mode: frame.defaults.permission_mode.clone(),
            mcp_servers: self.config.mcp_servers.clone(),
            setting_sources: frame.defaults.setting_sources.clone(),
        };

        tracing::info!(step = %step.name, agent = %step.agent_path, "dispatching legacy agent");
        let value = self.dispatch(rendered, options).await?;
        self.apply_output(ctx, step.output.as_deref(), value);
        self.check_fail_when(&step.name, step.fail_when.as_deref(), ctx)
    }

    async fn dispatch(
        &self,
        prompt: String,
        options: DispatchOptions,
    ) -> Result<Value, EngineError> {
        let stream = self
            .dispatcher
            .dispatch(DispatchRequest { prompt, options })
            .await?;
        let result = collect_result(stream).await?;
        Ok(result.into_structured_output()?)
    }

    /// Store the structured result and union any reported changed files.
    fn apply_output(&self, ctx: &WorkflowContext, output: Option<&str>, value: Value) {
        ctx.add_changed_files_from_result(&value);
        if let Some(name) = output {
            ctx.set(name, value);
        }
    }

    /// Fail fast when the post-step condition holds.
    fn check_fail_when(
        &self,
        step: &str,
        fail_when: Option<&str>,
        ctx: &WorkflowContext,
    ) -> Result<(), EngineError> {
        match fail_when {
            Some(condition) if ctx.evaluate(condition) => {
                Err(EngineError::fail_when(step, condition))
            }
            _ => Ok(()),
        }
    }

    /// Code step: invoke the registered handler with the resolved input.
    async fn run_code(
        &self,
        frame: &RunFrame,
        step: &CodeStepDef,
        ctx: &WorkflowContext,
    ) -> Result<(), EngineError> {
        let handler = self.registry.get(&step.handler)?;
        let input = resolve_code_input(ctx, step.input.as_ref());
        let deps = HandlerDeps {
            dispatcher: &self.dispatcher,
            sink: &self.sink,
            config: &self.config,
            run_id: &self.run_id,
            workflow: &frame.workflow,
        };
        handler.call(ctx, input, &deps).await
    }

    /// Parallel step: all children launched concurrently on the same
    /// context; started children run to completion, then the most severe
    /// signal propagates (Paused over Failed over other faults, ties by
    /// declaration order).
    async fn run_parallel(
        &self,
        frame: &RunFrame,
        step: &ParallelStepDef,
        ctx: &WorkflowContext,
    ) -> Result<(), EngineError> {
        let children = step
            .steps
            .iter()
            .map(|child| self.execute_step(frame, child, ctx));
        let results = futures::future::join_all(children).await;

        let mut paused = None;
        let mut failed = None;
        let mut fault = None;
        for result in results {
            match result {
                Ok(_) => {}
                Err(err @ EngineError::Paused { .. }) => {
                    paused.get_or_insert(err);
                }
                Err(err @ EngineError::Failed { .. }) => {
                    failed.get_or_insert(err);
                }
                Err(err) => {
                    fault.get_or_insert(err);
                }
            }
        }
        match paused.or(failed).or(fault) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Per-task step: topologically sorted iteration, one child context
    /// per task, non-clobbering merge back. On pause, the task's
    /// completion is recorded on the parent before re-raising so the
    /// checkpoint reflects the work done.
    async fn run_per_task(
        &self,
        frame: &RunFrame,
        step: &PerTaskStepDef,
        ctx: &WorkflowContext,
    ) -> Result<(), EngineError> {
        let source_value =
            ctx.resolve(&step.source)
                .ok_or_else(|| EngineError::SourceNotTaskArray {
                    step: step.name.clone(),
                    source_expr: step.source.clone(),
                })?;
        let tasks: Vec<Task> =
            serde_json::from_value(source_value).map_err(|_| EngineError::SourceNotTaskArray {
                step: step.name.clone(),
                source_expr: step.source.clone(),
            })?;
        let sorted = toposort::sort(tasks).map_err(|cycle| EngineError::Failed {
            step: step.name.clone(),
            condition: None,
            message: cycle.to_string(),
        })?;

        let ids: Vec<String> = sorted.iter().map(|t| t.id.clone()).collect();
        ctx.seed_task_tracking(&ids);

        let total = sorted.len();
        for (index, task) in sorted.iter().enumerate() {
            tracing::info!(
                step = %step.name,
                task = %task.id,
                position = index + 1,
                total,
                "task started"
            );
            let child = ctx.with_task(task, index, total);
            match self.execute_steps(frame, &step.steps, &child).await {
                Ok(()) => {
                    ctx.record_task_progress(&task.id);
                    ctx.merge_task_results(&child);
                }
                Err(err @ EngineError::Paused { .. }) => {
                    ctx.record_task_progress(&task.id);
                    ctx.merge_task_results(&child);
                    return Err(err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Loop step: repeat the body while the condition holds, bounded by
    /// `maxRetries`; exhaustion applies the step's policy. A `warn`
    /// exhaustion surfaces on the loop's completed audit entry.
    async fn run_loop(
        &self,
        frame: &RunFrame,
        step: &LoopStepDef,
        ctx: &WorkflowContext,
    ) -> Result<Option<Value>, EngineError> {
        for attempt in 0..step.max_retries {
            if attempt > 0 && !ctx.evaluate(&step.condition) {
                break;
            }
            self.execute_steps(frame, &step.steps, ctx).await?;
            if !ctx.evaluate(&step.condition) {
                break;
            }
        }

        if !ctx.evaluate(&step.condition) {
            return Ok(None);
        }

        let details = format!(
            "Loop exhausted {} retries. Condition '{}' still true.",
            step.max_retries, step.condition
        );
        match step.on_exhausted {
            OnExhausted::Escalate => Err(EngineError::Paused {
                step: step.name.clone(),
                details,
            }),
            OnExhausted::Fail => Err(EngineError::Failed {
                step: step.name.clone(),
                condition: Some(step.condition.clone()),
                message: format!("Loop exhausted {} retries", step.max_retries),
            }),
            OnExhausted::Warn => {
                tracing::warn!(step = %step.name, %details, "loop exhausted, continuing");
                Ok(Some(json!({ "warning": details })))
            }
        }
    }
}

/// Check steps are skippable via `--skip-checks`: name contains `review`
/// or `check` (case-insensitive), or a legacy agent path containing
/// `review`. Code steps are never check steps.
fn is_check_step(step: &StepDef) -> bool {
    if matches!(step, StepDef::Code(_)) {
        return false;
    }
    let name = step.name().to_lowercase();
    if name.contains("review") || name.contains("check") {
        return true;
    }
    step.agent_path()
        .map(|path| path.contains("review"))
        .unwrap_or(false)
}

/// The template view for an agent step: a snapshot of the context's
/// variables plus the step's input wiring.
fn wire_template_vars(
    ctx: &WorkflowContext,
    input: Option<&StepInput>,
) -> IndexMap<String, Value> {
    let mut view = ctx.template_vars();
    match input {
        None => {}
        Some(StepInput::Path(path)) => {
            // A resolved dot-path is injected under its leaf segment
            if let Some(value) = ctx.resolve(path) {
                let leaf = path.rsplit('.').next().unwrap_or(path);
                view.insert(leaf.to_string(), value);
            }
        }
        Some(StepInput::Map(map)) => {
            for (key, raw) in map {
                match raw {
                    Value::String(path) => {
                        if let Some(value) = ctx.resolve(path) {
                            view.insert(key.clone(), value);
                        }
                    }
                    other => {
                        view.insert(key.clone(), other.clone());
                    }
                }
            }
        }
    }
    view
}

/// Input for a code step: same resolution rules, but a single value
/// rather than a merge into the template view.
fn resolve_code_input(ctx: &WorkflowContext, input: Option<&StepInput>) -> Option<Value> {
    match input? {
        StepInput::Path(path) => ctx.resolve(path),
        StepInput::Map(map) => {
            let mut resolved = serde_json::Map::new();
            for (key, raw) in map {
                match raw {
                    Value::String(path) => {
                        if let Some(value) = ctx.resolve(path) {
                            resolved.insert(key.clone(), value);
                        }
                    }
                    other => {
                        resolved.insert(key.clone(), other.clone());
                    }
                }
            }
            Some(Value::Object(resolved))
        }
    }
}

#[cfg(test)]
#[path = "interpreter_tests.rs"]
mod tests;
