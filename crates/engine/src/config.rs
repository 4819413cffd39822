// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run configuration

use fm_workflow::WorkflowDefaults;
use serde_json::Value;
use std::path::PathBuf;

/// Run-wide configuration supplied by the driver (CLI flags, hook
/// runtime). Distinct from workflow `defaults`, which come from the
/// definition document.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Working directory for agent dispatches.
    pub working_dir: PathBuf,
    /// Project root: home of `.foreman/` overrides and issue stubs.
    pub project_root: PathBuf,
    pub permission_mode: Option<String>,
    pub setting_sources: Option<Vec<String>>,
    /// Opaque MCP server table forwarded to every dispatch.
    pub mcp_servers: Option<Value>,
    /// Skip steps classified as check steps.
    pub skip_checks: bool,
    /// Skip steps by exact name.
    pub skip_step_names: Vec<String>,
    /// Stop before any phase named `execute`.
    pub dry_run: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            project_root: PathBuf::from("."),
            permission_mode: None,
            setting_sources: None,
            mcp_servers: None,
            skip_checks: false,
            skip_step_names: Vec::new(),
            dry_run: false,
        }
    }
}

/// The run-wide defaults in effect: workflow `defaults` merged with the
/// run configuration. Installed once at run start; the parsed definition
/// is never mutated.
#[derive(Debug, Clone, Default)]
pub struct ActiveDefaults {
    pub model: Option<String>,
    pub permission_mode: Option<String>,
    pub setting_sources: Option<Vec<String>>,
    pub agent: Option<String>,
}

impl ActiveDefaults {
    /// Driver configuration wins over workflow defaults where both name a
    /// value.
    pub fn install(config: &RunConfig, defaults: Option<&WorkflowDefaults>) -> Self {
        let defaults = defaults.cloned().unwrap_or_default();
        Self {
            model: defaults.model,
            permission_mode: config.permission_mode.clone().or(defaults.permission_mode),
            setting_sources: config.setting_sources.clone().or(defaults.setting_sources),
            agent: defaults.agent,
        }
    }
}
