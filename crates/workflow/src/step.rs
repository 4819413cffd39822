// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step definitions
//!
//! A workflow phase is a step; composite steps nest further steps, so the
//! definition is a recursive tagged sum. The `type` field discriminates
//! `code` / `parallel` / `per-task` / `loop`; when absent the step is an
//! agent dispatch, composed (`prompt` names a prompt document) or legacy
//! (`agent` is a file path relative to the workflow document).

use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Input wiring for agent and code steps.
///
/// A bare string is a dot-path resolved against the context and injected
/// under its leaf segment. A map resolves each string value as a dot-path
/// and passes other values through literally.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StepInput {
    Path(String),
    Map(IndexMap<String, Value>),
}

/// Policy when a loop's retries are exhausted with the condition still true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnExhausted {
    /// Pause the run and surface a blocker (the default).
    #[default]
    Escalate,
    /// Fail the run.
    Fail,
    /// Log a warning on the loop's audit entry and continue.
    Warn,
}

/// Composed agent step: agent by name + prompt by name.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentStepDef {
    pub name: String,
    pub enabled: bool,
    pub prompt: String,
    /// Agent name; falls back to the workflow default agent.
    pub agent: Option<String>,
    pub model: Option<String>,
    pub input: Option<StepInput>,
    pub output: Option<String>,
    pub fail_when: Option<String>,
}

/// Legacy agent step: one markdown file, frontmatter agent + body template.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyAgentStepDef {
    pub name: String,
    pub enabled: bool,
    /// Path relative to the workflow document's directory.
    pub agent_path: String,
    pub model: Option<String>,
    pub input: Option<StepInput>,
    pub output: Option<String>,
    pub fail_when: Option<String>,
}

/// Code step: invokes a registered handler.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeStepDef {
    pub name: String,
    pub enabled: bool,
    pub handler: String,
    pub input: Option<StepInput>,
}

/// Parallel step: nested steps run concurrently on the same context.
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelStepDef {
    pub name: String,
    pub enabled: bool,
    pub steps: Vec<StepDef>,
}

/// Per-task step: iterates a topologically sorted task list, running the
/// nested steps once per task in a child context.
#[derive(Debug, Clone, PartialEq)]
pub struct PerTaskStepDef {
    pub name: String,
    pub enabled: bool,
    /// Dot-path to an array of tasks in the context.
    pub source: String,
    pub steps: Vec<StepDef>,
}

/// Loop step: repeats nested steps while the condition holds, bounded by
/// `max_retries`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopStepDef {
    pub name: String,
    pub enabled: bool,
    pub condition: String,
    pub max_retries: u32,
    pub on_exhausted: OnExhausted,
    pub steps: Vec<StepDef>,
}

/// A step definition: one of the five step kinds (agent steps count once,
/// in composed and legacy form).
#[derive(Debug, Clone, PartialEq)]
pub enum StepDef {
    Agent(AgentStepDef),
    LegacyAgent(LegacyAgentStepDef),
    Code(CodeStepDef),
    Parallel(ParallelStepDef),
    PerTask(PerTaskStepDef),
    Loop(LoopStepDef),
}

impl StepDef {
    pub fn name(&self) -> &str {
        match self {
            StepDef::Agent(s) => &s.name,
            StepDef::LegacyAgent(s) => &s.name,
            StepDef::Code(s) => &s.name,
            StepDef::Parallel(s) => &s.name,
            StepDef::PerTask(s) => &s.name,
            StepDef::Loop(s) => &s.name,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            StepDef::Agent(s) => s.enabled,
            StepDef::LegacyAgent(s) => s.enabled,
            StepDef::Code(s) => s.enabled,
            StepDef::Parallel(s) => s.enabled,
            StepDef::PerTask(s) => s.enabled,
            StepDef::Loop(s) => s.enabled,
        }
    }

    /// Nested steps for composite kinds.
    pub fn children(&self) -> Option<&[StepDef]> {
        match self {
            StepDef::Parallel(s) => Some(&s.steps),
            StepDef::PerTask(s) => Some(&s.steps),
            StepDef::Loop(s) => Some(&s.steps),
            _ => None,
        }
    }

    /// The agent file path for legacy steps (used by the skip policy).
    pub fn agent_path(&self) -> Option<&str> {
        match self {
            StepDef::LegacyAgent(s) => Some(&s.agent_path),
            _ => None,
        }
    }
}

/// Raw document shape: the union of all per-kind fields. Converted into
/// the tagged sum after deserialization so required-field errors name the
/// offending step.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawStep {
    name: String,
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(rename = "type")]
    kind: Option<String>,
    prompt: Option<String>,
    agent: Option<String>,
    model: Option<String>,
    input: Option<StepInput>,
    output: Option<String>,
    fail_when: Option<String>,
    handler: Option<String>,
    steps: Option<Vec<RawStep>>,
    source: Option<String>,
    condition: Option<String>,
    max_retries: Option<u32>,
    on_exhausted: Option<OnExhausted>,
}

impl RawStep {
    fn into_def(self) -> Result<StepDef, String> {
        let name = self.name;
        let enabled = self.enabled.unwrap_or(true);
        match self.kind.as_deref() {
            None => {
                if let Some(prompt) = self.prompt {
                    Ok(StepDef::Agent(AgentStepDef {
                        name,
                        enabled,
                        prompt,
                        agent: self.agent,
                        model: self.model,
                        input: self.input,
                        output: self.output,
                        fail_when: self.fail_when,
                    }))
                } else {
                    let agent_path = self
                        .agent
                        .ok_or_else(|| format!("step '{name}': needs 'prompt' or 'agent'"))?;
                    Ok(StepDef::LegacyAgent(LegacyAgentStepDef {
                        name,
                        enabled,
                        agent_path,
                        model: self.model,
                        input: self.input,
                        output: self.output,
                        fail_when: self.fail_when,
                    }))
                }
            }
            Some("code") => {
                let handler = self
                    .handler
                    .ok_or_else(|| format!("step '{name}': code step needs 'handler'"))?;
                Ok(StepDef::Code(CodeStepDef {
                    name,
                    enabled,
                    handler,
                    input: self.input,
                }))
            }
            Some("parallel") => {
                let steps = raw_children(self.steps, &name)?;
                Ok(StepDef::Parallel(ParallelStepDef {
                    name,
                    enabled,
                    steps,
                }))
            }
            Some("per-task") => {
                let source = self
                    .source
                    .ok_or_else(|| format!("step '{name}': per-task step needs 'source'"))?;
                let steps = raw_children(self.steps, &name)?;
                Ok(StepDef::PerTask(PerTaskStepDef {
                    name,
                    enabled,
                    source,
                    steps,
                }))
            }
            Some("loop") => {
                let condition = self
                    .condition
                    .ok_or_else(|| format!("step '{name}': loop step needs 'condition'"))?;
                let max_retries = self
                    .max_retries
                    .ok_or_else(|| format!("step '{name}': loop step needs 'maxRetries'"))?;
                if max_retries == 0 {
                    return Err(format!("step '{name}': maxRetries must be positive"));
                }
                let steps = raw_children(self.steps, &name)?;
                Ok(StepDef::Loop(LoopStepDef {
                    name,
                    enabled,
                    condition,
                    max_retries,
                    on_exhausted: self.on_exhausted.unwrap_or_default(),
                    steps,
                }))
            }
            Some(other) => Err(format!("step '{name}': unknown step type '{other}'")),
        }
    }
}

fn raw_children(steps: Option<Vec<RawStep>>, parent: &str) -> Result<Vec<StepDef>, String> {
    steps
        .ok_or_else(|| format!("step '{parent}': composite step needs 'steps'"))?
        .into_iter()
        .map(RawStep::into_def)
        .collect()
}

impl<'de> Deserialize<'de> for StepDef {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = RawStep::deserialize(d)?;
        raw.into_def().map_err(de::Error::custom)
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
