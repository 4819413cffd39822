// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fm run` / `fm resume`

use crate::output;
use crate::Roots;
use anyhow::{Context, Result};
use clap::Args;
use fm_adapters::ClaudeDispatcher;
use fm_core::RunId;
use fm_engine::{Engine, RunConfig};
use fm_storage::FsSessionSink;
use std::path::PathBuf;

#[derive(Args)]
pub struct RunArgs {
    /// Workflow name (resolved project-first, then builtin)
    pub workflow: String,

    /// Specification file describing the work to be done
    #[arg(long = "spec", value_name = "FILE")]
    pub spec: PathBuf,

    #[command(flatten)]
    pub options: RunOptions,
}

#[derive(Args)]
pub struct ResumeArgs {
    /// Checkpoint id (the run id printed when the run paused)
    #[arg(long = "checkpoint", value_name = "RUN_ID")]
    pub checkpoint: String,

    /// Phase to resume from
    #[arg(long = "phase", value_name = "NAME")]
    pub phase: String,

    #[command(flatten)]
    pub options: RunOptions,
}

#[derive(Args)]
pub struct RunOptions {
    /// Skip review/check steps
    #[arg(long = "skip-checks")]
    pub skip_checks: bool,

    /// Skip a step by name (repeatable)
    #[arg(long = "skip-step", value_name = "NAME")]
    pub skip_steps: Vec<String>,

    /// Stop before the execute phase
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Permission mode forwarded to agent sessions
    #[arg(long = "permission-mode", value_name = "MODE")]
    pub permission_mode: Option<String>,

    /// Claude binary to dispatch with
    #[arg(long = "agent-binary", value_name = "BIN", default_value = "claude")]
    pub agent_binary: String,
}

impl RunOptions {
    fn config(&self, roots: &Roots) -> RunConfig {
        RunConfig {
            working_dir: roots.project_root.clone(),
            project_root: roots.project_root.clone(),
            permission_mode: self.permission_mode.clone(),
            setting_sources: None,
            mcp_servers: None,
            skip_checks: self.skip_checks,
            skip_step_names: self.skip_steps.clone(),
            dry_run: self.dry_run,
        }
    }
}

pub async fn execute(roots: &Roots, args: RunArgs) -> Result<()> {
    let run_id = RunId::generate();
    let engine = engine(roots, &args.options, run_id.clone());

    eprintln!("run {} starting", run_id.short(8));
    let result = engine
        .run(&args.workflow, &args.spec)
        .await
        .with_context(|| format!("workflow '{}' did not finish", args.workflow))?;
    output::print_result(&result, &run_id);
    Ok(())
}

pub async fn resume(roots: &Roots, args: ResumeArgs) -> Result<()> {
    let run_id = RunId::new(args.checkpoint.clone());
    let engine = engine(roots, &args.options, run_id.clone());

    eprintln!("run {} resuming at phase '{}'", run_id.short(8), args.phase);
    let result = engine
        .resume(&args.phase)
        .await
        .with_context(|| format!("resume of run '{}' did not finish", args.checkpoint))?;
    output::print_result(&result, &run_id);
    Ok(())
}

fn engine(
    roots: &Roots,
    options: &RunOptions,
    run_id: RunId,
) -> Engine<ClaudeDispatcher, FsSessionSink> {
    let dispatcher = ClaudeDispatcher::new(options.agent_binary.as_str());
    let sink = FsSessionSink::new(roots.sessions_dir(), run_id.clone());
    Engine::new(dispatcher, sink, options.config(roots))
        .with_resolver(roots.resolver())
        .with_run_id(run_id)
}
