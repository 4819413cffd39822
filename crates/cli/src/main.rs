// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fm - foreman CLI

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{run, validate, workflows};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fm",
    version,
    about = "foreman - deterministic workflows for coding agents"
)]
struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(long = "project-root", global = true, value_name = "DIR")]
    project_root: Option<PathBuf>,

    /// Plugin root holding builtin workflows/agents/prompts
    /// (defaults to $FOREMAN_HOME, then the user data dir)
    #[arg(long = "plugin-root", global = true, value_name = "DIR")]
    plugin_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow against a specification file
    Run(run::RunArgs),
    /// Resume a paused run from its checkpoint
    Resume(run::ResumeArgs),
    /// Validate a workflow definition and its referenced documents
    Validate(validate::ValidateArgs),
    /// List workflows visible through the resolver
    Workflows(workflows::WorkflowsArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let roots = Roots::from_cli(&cli)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        match cli.command {
            Commands::Run(args) => run::execute(&roots, args).await,
            Commands::Resume(args) => run::resume(&roots, args).await,
            Commands::Validate(args) => validate::execute(&roots, args),
            Commands::Workflows(args) => workflows::execute(&roots, args),
        }
    })
}

/// Resolved project and plugin roots shared by every command.
pub struct Roots {
    pub project_root: PathBuf,
    pub plugin_root: PathBuf,
}

impl Roots {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let project_root = match &cli.project_root {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let plugin_root = cli
            .plugin_root
            .clone()
            .or_else(|| std::env::var_os("FOREMAN_HOME").map(PathBuf::from))
            .or_else(|| dirs::data_dir().map(|d| d.join("foreman")))
            .unwrap_or_else(|| project_root.join(".foreman"));
        Ok(Self {
            project_root,
            plugin_root,
        })
    }

    pub fn resolver(&self) -> fm_workflow::DocResolver {
        fm_workflow::DocResolver::new(&self.plugin_root).with_project_root(&self.project_root)
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.project_root.join(".foreman").join("sessions")
    }
}
