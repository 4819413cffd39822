// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session sink: audit log, checkpoint, blocker, terminal record
//!
//! Filesystem layout, one directory per run under the sessions root:
//!
//! ```text
//! <sessions>/<run-id>/
//!   audit.jsonl       append-only step lifecycle log
//!   checkpoint.json   written on pause (atomic tmp + rename)
//!   blocker.md        human-readable blocker description
//!   result.json       terminal marker
//! ```

use async_trait::async_trait;
use fm_core::{AuditEntry, Checkpoint, RunId, WorkflowResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from sink operations.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable side-effect channel for one workflow run.
///
/// Appends must tolerate concurrent calls from parallel steps; the
/// filesystem implementation serializes writers with a mutex.
#[async_trait]
pub trait SessionSink: Send + Sync + 'static {
    async fn append_audit_entry(&self, entry: &AuditEntry) -> Result<(), SinkError>;

    /// Persist a checkpoint. Must be durable before the engine reports
    /// the run as paused.
    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), SinkError>;

    async fn load_checkpoint(&self, run_id: &RunId) -> Result<Option<Checkpoint>, SinkError>;

    async fn write_blocker(&self, details: &str) -> Result<(), SinkError>;

    async fn complete_session(&self, result: &WorkflowResult) -> Result<(), SinkError>;
}

/// Filesystem-backed session sink.
pub struct FsSessionSink {
    sessions_root: PathBuf,
    run_id: RunId,
    // Serializes audit appends from parallel steps
    audit: Mutex<()>,
}

impl FsSessionSink {
    pub fn new(sessions_root: impl Into<PathBuf>, run_id: RunId) -> Self {
        Self {
            sessions_root: sessions_root.into(),
            run_id,
            audit: Mutex::new(()),
        }
    }

    /// The directory this run's records live in.
    pub fn session_dir(&self) -> PathBuf {
        self.sessions_root.join(self.run_id.as_str())
    }

    fn ensure_session_dir(&self) -> Result<PathBuf, SinkError> {
        let dir = self.session_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn checkpoint_path_for(&self, run_id: &RunId) -> PathBuf {
        self.sessions_root
            .join(run_id.as_str())
            .join("checkpoint.json")
    }
}

#[async_trait]
impl SessionSink for FsSessionSink {
    async fn append_audit_entry(&self, entry: &AuditEntry) -> Result<(), SinkError> {
        let dir = self.ensure_session_dir()?;
        let line = serde_json::to_string(entry)?;
        let _guard = self.audit.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("audit.jsonl"))?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), SinkError> {
        let dir = self.ensure_session_dir()?;
        let path = dir.join("checkpoint.json");
        write_atomic(&path, &serde_json::to_vec_pretty(checkpoint)?)?;
        tracing::info!(
            run_id = %self.run_id,
            phase = checkpoint.current_phase.as_deref().unwrap_or("-"),
            "checkpoint saved"
        );
        Ok(())
    }

    async fn load_checkpoint(&self, run_id: &RunId) -> Result<Option<Checkpoint>, SinkError> {
        let path = self.checkpoint_path_for(run_id);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    async fn write_blocker(&self, details: &str) -> Result<(), SinkError> {
        let dir = self.ensure_session_dir()?;
        std::fs::write(dir.join("blocker.md"), details)?;
        Ok(())
    }

    async fn complete_session(&self, result: &WorkflowResult) -> Result<(), SinkError> {
        let dir = self.ensure_session_dir()?;
        std::fs::write(dir.join("result.json"), serde_json::to_vec_pretty(result)?)?;
        Ok(())
    }
}

/// Write via a temp file, fsync, and rename so a crashed write never
/// leaves a torn checkpoint for a later resume to trip over.
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), SinkError> {
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    if let Some(parent) = path.parent() {
        // Make the rename itself durable
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
