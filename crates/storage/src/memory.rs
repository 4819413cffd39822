// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory session sink for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::session::{SessionSink, SinkError};
use async_trait::async_trait;
use fm_core::{AuditEntry, AuditStatus, Checkpoint, RunId, WorkflowResult};
use parking_lot::Mutex;
use std::sync::Arc;

/// Records every sink call; checkpoints can be pre-seeded for resume
/// tests.
#[derive(Clone, Default)]
pub struct MemorySessionSink {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    entries: Vec<AuditEntry>,
    checkpoints: Vec<Checkpoint>,
    blockers: Vec<String>,
    results: Vec<WorkflowResult>,
}

impl MemorySessionSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a checkpoint as if a previous run had paused.
    pub fn seed_checkpoint(&self, checkpoint: Checkpoint) {
        self.inner.lock().checkpoints.push(checkpoint);
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.inner.lock().entries.clone()
    }

    /// Audit entries for one step, in emission order.
    pub fn entries_for(&self, step: &str) -> Vec<AuditEntry> {
        self.inner
            .lock()
            .entries
            .iter()
            .filter(|e| e.step == step)
            .cloned()
            .collect()
    }

    /// Statuses for one step, in emission order.
    pub fn statuses_for(&self, step: &str) -> Vec<AuditStatus> {
        self.entries_for(step).iter().map(|e| e.status).collect()
    }

    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.inner.lock().checkpoints.clone()
    }

    pub fn last_checkpoint(&self) -> Option<Checkpoint> {
        self.inner.lock().checkpoints.last().cloned()
    }

    pub fn blockers(&self) -> Vec<String> {
        self.inner.lock().blockers.clone()
    }

    pub fn results(&self) -> Vec<WorkflowResult> {
        self.inner.lock().results.clone()
    }
}

#[async_trait]
impl SessionSink for MemorySessionSink {
    async fn append_audit_entry(&self, entry: &AuditEntry) -> Result<(), SinkError> {
        self.inner.lock().entries.push(entry.clone());
        Ok(())
    }

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), SinkError> {
        self.inner.lock().checkpoints.push(checkpoint.clone());
        Ok(())
    }

    async fn load_checkpoint(&self, run_id: &RunId) -> Result<Option<Checkpoint>, SinkError> {
        Ok(self
            .inner
            .lock()
            .checkpoints
            .iter()
            .rev()
            .find(|c| c.run_id == run_id.as_str())
            .cloned())
    }

    async fn write_blocker(&self, details: &str) -> Result<(), SinkError> {
        self.inner.lock().blockers.push(details.to_string());
        Ok(())
    }

    async fn complete_session(&self, result: &WorkflowResult) -> Result<(), SinkError> {
        self.inner.lock().results.push(result.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
