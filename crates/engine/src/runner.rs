// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run orchestration
//!
//! Drives a workflow definition phase by phase, catching the `Paused` and
//! `Failed` control signals and assembling the terminal result. A
//! checkpoint is durable before a paused result is returned.

use crate::config::{ActiveDefaults, RunConfig};
use crate::context::WorkflowContext;
use crate::error::EngineError;
use crate::handlers::HandlerRegistry;
use crate::interpreter::{RunFrame, StepOutcome};
use async_trait::async_trait;
use fm_adapters::AgentDispatcher;
use fm_core::{RunId, WorkflowResult, WorkflowStatus};
use fm_storage::SessionSink;
use fm_workflow::{DocKind, DocResolver, SchemaRegistry, WorkflowDef};
use std::path::Path;
use std::sync::Arc;

/// Hook invoked after each completed top-level phase.
#[async_trait]
pub trait PhaseObserver: Send + Sync {
    async fn on_phase_complete(&self, phase: &str, ctx: &WorkflowContext);
}

/// The workflow engine: dispatcher + sink + definitions + configuration.
pub struct Engine<D, S> {
    pub(crate) dispatcher: D,
    pub(crate) sink: S,
    pub(crate) resolver: Option<DocResolver>,
    pub(crate) registry: HandlerRegistry,
    pub(crate) schemas: SchemaRegistry,
    pub(crate) config: RunConfig,
    pub(crate) run_id: RunId,
    pub(crate) observer: Option<Arc<dyn PhaseObserver>>,
}

impl<D, S> Engine<D, S>
where
    D: AgentDispatcher,
    S: SessionSink,
{
    pub fn new(dispatcher: D, sink: S, config: RunConfig) -> Self {
        Self {
            dispatcher,
            sink,
            resolver: None,
            registry: HandlerRegistry::with_builtins(),
            schemas: SchemaRegistry::with_builtins(),
            config,
            run_id: RunId::generate(),
            observer: None,
        }
    }

    pub fn with_resolver(mut self, resolver: DocResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_schemas(mut self, schemas: SchemaRegistry) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn with_phase_observer(mut self, observer: Arc<dyn PhaseObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Start a new run: load the workflow by name, seed a context with the
    /// spec path, and execute every phase.
    pub async fn run(
        &self,
        workflow_name: &str,
        spec_path: &Path,
    ) -> Result<WorkflowResult, EngineError> {
        let resolver = self
            .resolver
            .as_ref()
            .ok_or_else(|| EngineError::ResolverRequired(workflow_name.to_string()))?;
        let resolved = resolver.resolve(DocKind::Workflows, workflow_name)?;
        let def = WorkflowDef::load(&resolved.path)?;
        let base_dir = WorkflowDef::base_dir(&resolved.path);

        let ctx = WorkflowContext::new();
        ctx.set(
            "specPath",
            serde_json::Value::String(spec_path.display().to_string()),
        );
        self.drive(&def, &base_dir, workflow_name, ctx, 0).await
    }

    /// Resume this engine's run from its checkpoint at the named phase.
    /// Previously completed phases are not re-executed.
    pub async fn resume(&self, phase: &str) -> Result<WorkflowResult, EngineError> {
        let checkpoint = self
            .sink
            .load_checkpoint(&self.run_id)
            .await?
            .ok_or_else(|| EngineError::CheckpointNotFound(self.run_id.to_string()))?;

        let resolver = self
            .resolver
            .as_ref()
            .ok_or_else(|| EngineError::ResolverRequired(checkpoint.workflow.clone()))?;
        let resolved = resolver.resolve(DocKind::Workflows, &checkpoint.workflow)?;
        let def = WorkflowDef::load(&resolved.path)?;
        let base_dir = WorkflowDef::base_dir(&resolved.path);

        let start = def
            .phase_index(phase)
            .ok_or_else(|| EngineError::UnknownPhase(phase.to_string()))?;
        let workflow_name = checkpoint.workflow.clone();
        let ctx = WorkflowContext::from_checkpoint(&checkpoint);
        self.drive(&def, &base_dir, &workflow_name, ctx, start).await
    }

    /// Run an already-loaded definition. Used by embedders and tests that
    /// construct definitions directly.
    pub async fn run_definition(
        &self,
        def: &WorkflowDef,
        base_dir: &Path,
        workflow_name: &str,
        ctx: WorkflowContext,
    ) -> Result<WorkflowResult, EngineError> {
        self.drive(def, base_dir, workflow_name, ctx, 0).await
    }

    async fn drive(
        &self,
        def: &WorkflowDef,
        base_dir: &Path,
        workflow_name: &str,
        ctx: WorkflowContext,
        start_index: usize,
    ) -> Result<WorkflowResult, EngineError> {
        let frame = RunFrame::new(
            ActiveDefaults::install(&self.config, def.defaults.as_ref()),
            base_dir.to_path_buf(),
            workflow_name.to_string(),
        );

        for phase in def.phases.iter().skip(start_index) {
            if self.config.dry_run && phase.name() == "execute" {
                tracing::info!(phase = phase.name(), "dry run: stopping before execute");
                break;
            }
            ctx.set_current_phase(phase.name());

            match self.execute_step(&frame, phase, &ctx).await {
                Ok(StepOutcome::Ran) => {
                    ctx.mark_phase_completed(phase.name());
                    if let Some(observer) = &self.observer {
                        observer.on_phase_complete(phase.name(), &ctx).await;
                    }
                }
                Ok(StepOutcome::Skipped) => {}
                Err(EngineError::Paused { details, .. }) => {
                    let checkpoint = ctx.to_checkpoint(&self.run_id, workflow_name);
                    self.sink.save_checkpoint(&checkpoint).await?;
                    self.sink.write_blocker(&details).await?;
                    let result = assemble(&ctx, WorkflowStatus::Paused)
                        .with_pause(ctx.current_phase(), details);
                    self.sink.complete_session(&result).await?;
                    return Ok(result);
                }
                Err(err @ EngineError::Failed { .. }) => {
                    let result =
                        assemble(&ctx, WorkflowStatus::Failed).with_error(err.to_string());
                    self.sink.complete_session(&result).await?;
                    return Ok(result);
                }
                Err(other) => return Err(other),
            }
        }

        let result = assemble(&ctx, WorkflowStatus::Completed);
        self.sink.complete_session(&result).await?;
        Ok(result)
    }
}

fn assemble(ctx: &WorkflowContext, status: WorkflowStatus) -> WorkflowResult {
    WorkflowResult {
        status,
        outputs: ctx.template_vars(),
        completed_phases: ctx.completed_phases(),
        changed_files: ctx.changed_files(),
        paused_at_phase: None,
        blocker_details: None,
        error: None,
    }
}

trait ResultExt {
    fn with_pause(self, phase: Option<String>, details: String) -> WorkflowResult;
    fn with_error(self, error: String) -> WorkflowResult;
}

impl ResultExt for WorkflowResult {
    fn with_pause(mut self, phase: Option<String>, details: String) -> WorkflowResult {
        self.paused_at_phase = phase;
        self.blocker_details = Some(details);
        self
    }

    fn with_error(mut self, error: String) -> WorkflowResult {
        self.error = Some(error);
        self
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
