// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task model for per-task iteration

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A unit of work produced by an analysis step and iterated by per-task
/// steps.
///
/// The engine only interprets `id` and `dependencies`; any other fields the
/// producing agent emits (title, description, acceptance criteria, ...) are
/// carried through opaquely and surfaced to prompts via the `task` template
/// variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    pub fn new(id: impl Into<String>, dependencies: Vec<String>) -> Self {
        Self {
            id: id.into(),
            dependencies,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
