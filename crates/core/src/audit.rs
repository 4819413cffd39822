// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit log records
//!
//! Every step executed by the engine emits exactly one `started` entry
//! followed by exactly one terminal entry (`completed`, `failed`), or a
//! single `skipped` entry when the step never ran. The sink appends these
//! in emission order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Started,
    Completed,
    Failed,
    Skipped,
}

/// One record in the append-only audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub step: String,
    pub status: AuditStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl AuditEntry {
    fn new(step: impl Into<String>, status: AuditStatus) -> Self {
        Self {
            step: step.into(),
            status,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn started(step: impl Into<String>) -> Self {
        Self::new(step, AuditStatus::Started)
    }

    pub fn completed(step: impl Into<String>) -> Self {
        Self::new(step, AuditStatus::Completed)
    }

    pub fn failed(step: impl Into<String>) -> Self {
        Self::new(step, AuditStatus::Failed)
    }

    pub fn skipped(step: impl Into<String>) -> Self {
        Self::new(step, AuditStatus::Skipped)
    }

    /// Attach metadata (skip reason, error text, resolved document paths).
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
