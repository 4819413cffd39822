// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow documents
//!
//! A workflow is a YAML document: optional run-wide defaults plus an
//! ordered list of phases, each phase a step definition. Loading performs
//! full static validation (name uniqueness, condition well-formedness) so
//! a run never starts against a structurally bad definition.

use crate::condition;
use crate::error::LoadError;
use crate::step::StepDef;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Run-wide defaults. Applied once at run start; per-step values override.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkflowDefaults {
    pub model: Option<String>,
    pub permission_mode: Option<String>,
    pub setting_sources: Option<Vec<String>>,
    /// Default agent name for composed steps that omit `agent`.
    pub agent: Option<String>,
}

/// A parsed workflow definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkflowDef {
    #[serde(default)]
    pub defaults: Option<WorkflowDefaults>,
    pub phases: Vec<StepDef>,
}

impl WorkflowDef {
    /// Parse a workflow document and validate it. `path` is used for error
    /// reporting only.
    pub fn parse(text: &str, path: &Path) -> Result<Self, LoadError> {
        let def: WorkflowDef = serde_yaml::from_str(text).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let errors = def.validate();
        if !errors.is_empty() {
            return Err(LoadError::Invalid {
                path: path.to_path_buf(),
                errors,
            });
        }
        Ok(def)
    }

    /// Load a workflow document from disk.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Collect every static validation problem in the definition.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for phase in &self.phases {
            if !seen.insert(phase.name().to_string()) {
                errors.push(format!("duplicate phase name '{}'", phase.name()));
            }
        }

        validate_steps(&self.phases, "phases", &mut errors);
        errors
    }

    /// Index of the phase with the given name.
    pub fn phase_index(&self, name: &str) -> Option<usize> {
        self.phases.iter().position(|p| p.name() == name)
    }

    /// The directory the workflow document lives in; base for legacy agent
    /// paths.
    pub fn base_dir(path: &Path) -> PathBuf {
        path.parent().unwrap_or(Path::new(".")).to_path_buf()
    }
}

/// Recursive validation over a sibling list: unique names, well-formed
/// conditions on every `condition` and `failWhen`.
fn validate_steps(steps: &[StepDef], location: &str, errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for step in steps {
        let name = step.name();
        if !seen.insert(name.to_string()) {
            errors.push(format!("{location}: duplicate step name '{name}'"));
        }

        let fail_when = match step {
            StepDef::Agent(s) => s.fail_when.as_deref(),
            StepDef::LegacyAgent(s) => s.fail_when.as_deref(),
            _ => None,
        };
        if let Some(expr) = fail_when {
            for problem in condition::validate(expr) {
                errors.push(format!("{location}.{name}: failWhen: {problem}"));
            }
        }

        if let StepDef::Loop(s) = step {
            for problem in condition::validate(&s.condition) {
                errors.push(format!("{location}.{name}: condition: {problem}"));
            }
        }

        if let Some(children) = step.children() {
            validate_steps(children, &format!("{location}.{name}"), errors);
        }
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
