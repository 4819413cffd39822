// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal workflow outcomes

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a workflow run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Completed,
    Failed,
    Paused,
}

/// The structured outcome returned by the engine.
///
/// `completed_phases`, `changed_files`, and `outputs` are populated for
/// every status so callers can inspect partial progress after a failure
/// or pause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    pub status: WorkflowStatus,
    #[serde(default)]
    pub outputs: IndexMap<String, Value>,
    #[serde(default)]
    pub completed_phases: Vec<String>,
    #[serde(default)]
    pub changed_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at_phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocker_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowResult {
    pub fn is_completed(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }

    pub fn is_paused(&self) -> bool {
        self.status == WorkflowStatus::Paused
    }

    pub fn is_failed(&self) -> bool {
        self.status == WorkflowStatus::Failed
    }
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
