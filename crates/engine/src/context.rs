// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow context
//!
//! The per-run state container: named step outputs, completed phases,
//! current phase/task, and the accumulated changed-files set. One context
//! is owned by the run; per-task children get a fresh context seeded from
//! the parent and are merged back explicitly.
//!
//! Parallel steps share the same context, so state lives behind a short
//! mutex. The lock is never held across an await point.

use fm_core::{Checkpoint, RunId, Task};
use fm_workflow::condition;
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Variable names used for per-task progress bookkeeping. They live in
/// the variable map so they serialize with every checkpoint.
const TASKS_COMPLETED: &str = "tasksCompleted";
const TASKS_PENDING: &str = "tasksPending";

#[derive(Debug, Default)]
struct ContextState {
    variables: IndexMap<String, Value>,
    completed_phases: IndexSet<String>,
    current_phase: Option<String>,
    current_task_id: Option<String>,
    changed_files: IndexSet<String>,
}

/// Mutable state for one workflow run (or one per-task child).
#[derive(Debug, Default)]
pub struct WorkflowContext {
    state: Mutex<ContextState>,
}

impl WorkflowContext {
    pub fn new() -> Self {
        Self::default()
    }

    // === variables ===

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.state.lock().variables.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.state.lock().variables.get(name).cloned()
    }

    /// Dot-path lookup against the variable map.
    pub fn resolve(&self, path: &str) -> Option<Value> {
        condition::resolve_path(&self.state.lock().variables, path)
    }

    /// Evaluate a condition expression; errors and missing paths are
    /// false.
    pub fn evaluate(&self, expr: &str) -> bool {
        condition::evaluate(expr, &self.state.lock().variables)
    }

    /// Snapshot of the variable map, the base of every template view.
    pub fn template_vars(&self) -> IndexMap<String, Value> {
        self.state.lock().variables.clone()
    }

    // === phases ===

    pub fn set_current_phase(&self, name: impl Into<String>) {
        self.state.lock().current_phase = Some(name.into());
    }

    pub fn current_phase(&self) -> Option<String> {
        self.state.lock().current_phase.clone()
    }

    pub fn current_task_id(&self) -> Option<String> {
        self.state.lock().current_task_id.clone()
    }

    /// Idempotent; order of first completion is preserved.
    pub fn mark_phase_completed(&self, name: impl Into<String>) {
        self.state.lock().completed_phases.insert(name.into());
    }

    pub fn completed_phases(&self) -> Vec<String> {
        self.state
            .lock()
            .completed_phases
            .iter()
            .cloned()
            .collect()
    }

    // === changed files ===

    pub fn add_changed_file(&self, path: impl Into<String>) {
        self.state.lock().changed_files.insert(path.into());
    }

    /// Union in the `filesChanged` paths of a structured step result, if
    /// the value has that shape.
    pub fn add_changed_files_from_result(&self, value: &Value) {
        let Some(files) = value.get("filesChanged").and_then(Value::as_array) else {
            return;
        };
        let mut state = self.state.lock();
        for file in files {
            if let Some(path) = file.get("path").and_then(Value::as_str) {
                state.changed_files.insert(path.to_string());
            }
        }
    }

    pub fn changed_files(&self) -> Vec<String> {
        self.state.lock().changed_files.iter().cloned().collect()
    }

    /// True when any accumulated changed file matches any of the globs.
    pub fn changed_files_match(&self, globs: &[String]) -> bool {
        let patterns: Vec<glob::Pattern> = globs
            .iter()
            .filter_map(|g| glob::Pattern::new(g).ok())
            .collect();
        let state = self.state.lock();
        state
            .changed_files
            .iter()
            .any(|file| patterns.iter().any(|p| p.matches(file)))
    }

    // === per-task children ===

    /// Spawn a child context for one task iteration: parent variables
    /// shallow-copied, `task`/`taskIndex`/`taskTotal` set, progress state
    /// carried over, `currentTaskId` pointing at the task.
    pub fn with_task(&self, task: &Task, index: usize, total: usize) -> WorkflowContext {
        let state = self.state.lock();
        let mut variables = state.variables.clone();
        variables.insert(
            "task".to_string(),
            serde_json::to_value(task).unwrap_or(Value::Null),
        );
        variables.insert("taskIndex".to_string(), json!(index));
        variables.insert("taskTotal".to_string(), json!(total));
        WorkflowContext {
            state: Mutex::new(ContextState {
                variables,
                completed_phases: state.completed_phases.clone(),
                current_phase: state.current_phase.clone(),
                current_task_id: Some(task.id.clone()),
                changed_files: state.changed_files.clone(),
            }),
        }
    }

    /// Merge a finished child back: child-only variables are copied,
    /// changed files and completed phases are set-unioned. Keys the
    /// parent already has are never overwritten; cross-task aggregation
    /// is an explicit code step's job.
    pub fn merge_task_results(&self, child: &WorkflowContext) {
        let child_state = child.state.lock();
        let mut state = self.state.lock();
        for (key, value) in &child_state.variables {
            if !state.variables.contains_key(key) {
                state.variables.insert(key.clone(), value.clone());
            }
        }
        for file in &child_state.changed_files {
            state.changed_files.insert(file.clone());
        }
        for phase in &child_state.completed_phases {
            state.completed_phases.insert(phase.clone());
        }
    }

    /// Seed `tasksPending`/`tasksCompleted` before a per-task iteration.
    /// Ids already recorded as completed (a resumed run) stay completed.
    pub fn seed_task_tracking(&self, ids: &[String]) {
        let mut state = self.state.lock();
        let completed = string_list(state.variables.get(TASKS_COMPLETED));
        let pending: Vec<String> = ids
            .iter()
            .filter(|id| !completed.contains(*id))
            .cloned()
            .collect();
        state
            .variables
            .entry(TASKS_COMPLETED.to_string())
            .or_insert_with(|| json!([]));
        state
            .variables
            .insert(TASKS_PENDING.to_string(), json!(pending));
    }

    /// Record a task as done: appended to `tasksCompleted` (once),
    /// removed from `tasksPending`.
    pub fn record_task_progress(&self, task_id: &str) {
        let mut state = self.state.lock();
        let mut completed = string_list(state.variables.get(TASKS_COMPLETED));
        if !completed.iter().any(|id| id == task_id) {
            completed.push(task_id.to_string());
        }
        state
            .variables
            .insert(TASKS_COMPLETED.to_string(), json!(completed));

        let mut pending = string_list(state.variables.get(TASKS_PENDING));
        pending.retain(|id| id != task_id);
        state
            .variables
            .insert(TASKS_PENDING.to_string(), json!(pending));
    }

    // === checkpointing ===

    pub fn to_checkpoint(&self, run_id: &RunId, workflow: &str) -> Checkpoint {
        let state = self.state.lock();
        Checkpoint {
            run_id: run_id.as_str().to_string(),
            workflow: workflow.to_string(),
            current_phase: state.current_phase.clone(),
            current_task_id: state.current_task_id.clone(),
            variables: state.variables.clone(),
            completed_phases: state.completed_phases.iter().cloned().collect(),
            changed_files: state.changed_files.iter().cloned().collect(),
            tasks_completed: string_list(state.variables.get(TASKS_COMPLETED)),
            tasks_pending: string_list(state.variables.get(TASKS_PENDING)),
            saved_at: chrono::Utc::now(),
        }
    }

    pub fn from_checkpoint(checkpoint: &Checkpoint) -> Self {
        WorkflowContext {
            state: Mutex::new(ContextState {
                variables: checkpoint.variables.clone(),
                completed_phases: checkpoint.completed_phases.iter().cloned().collect(),
                current_phase: checkpoint.current_phase.clone(),
                current_task_id: checkpoint.current_task_id.clone(),
                changed_files: checkpoint.changed_files.iter().cloned().collect(),
            }),
        }
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
