// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy
//!
//! `Paused` and `Failed` are control signals: run orchestration catches
//! them and turns them into `paused`/`failed` results. Everything else
//! is an infrastructure fault that propagates to the caller.

use fm_adapters::DispatchError;
use fm_storage::SinkError;
use fm_workflow::LoadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Intentional blocker: the run can be resumed from its checkpoint.
    #[error("paused at step '{step}': {details}")]
    Paused { step: String, details: String },

    /// Business failure: the run ends with status `failed`.
    #[error("step '{step}' failed: {message}")]
    Failed {
        step: String,
        condition: Option<String>,
        message: String,
    },

    #[error("unknown handler '{0}'")]
    UnknownHandler(String),

    #[error("handler error: {0}")]
    Handler(String),

    #[error("'{0}' needs a document resolver, but none is configured")]
    ResolverRequired(String),

    #[error("step '{0}': no agent named and the workflow has no default agent")]
    NoAgent(String),

    #[error("step '{step}': source '{source_expr}' did not resolve to an array of tasks")]
    SourceNotTaskArray { step: String, source_expr: String },

    #[error("unknown phase '{0}'")]
    UnknownPhase(String),

    #[error("no checkpoint found for run '{0}'")]
    CheckpointNotFound(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl EngineError {
    /// Failure raised when a `failWhen` condition fires.
    pub fn fail_when(step: &str, condition: &str) -> Self {
        EngineError::Failed {
            step: step.to_string(),
            condition: Some(condition.to_string()),
            message: format!("failWhen condition '{condition}' evaluated true"),
        }
    }
}
