// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake dispatcher for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::dispatcher::{AgentDispatcher, DispatchError, DispatchRequest, MessageStream};
use crate::message::{AgentMessage, ResultMessage};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Recorded call to the fake dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchCall {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub model: Option<String>,
    pub allowed_tools: Option<Vec<String>>,
    pub has_output_schema: bool,
}

/// What the fake returns for a dispatch.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Success(Value),
    Failure { subtype: String, errors: Vec<String> },
    SpawnError(String),
}

impl ScriptedResponse {
    fn into_result(self) -> Result<ResultMessage, DispatchError> {
        match self {
            ScriptedResponse::Success(value) => Ok(ResultMessage::success(value)),
            ScriptedResponse::Failure { subtype, errors } => {
                Ok(ResultMessage::failure(subtype, errors))
            }
            ScriptedResponse::SpawnError(message) => Err(DispatchError::Spawn(message)),
        }
    }
}

/// Fake dispatcher: scripted responses in FIFO order, every call recorded.
///
/// When the script queue is empty the default response is used, so a loop
/// scenario can model "the reviewer keeps finding issues" with a single
/// default.
#[derive(Clone, Default)]
pub struct FakeDispatcher {
    inner: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    script: VecDeque<ScriptedResponse>,
    default: Option<ScriptedResponse>,
    calls: Vec<DispatchCall>,
}

impl FakeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful dispatch yielding this structured output.
    pub fn push_success(&self, structured_output: Value) {
        self.inner
            .lock()
            .script
            .push_back(ScriptedResponse::Success(structured_output));
    }

    /// Queue a failed dispatch.
    pub fn push_failure(&self, subtype: impl Into<String>, errors: Vec<String>) {
        self.inner.lock().script.push_back(ScriptedResponse::Failure {
            subtype: subtype.into(),
            errors,
        });
    }

    /// Response used whenever the script queue is empty.
    pub fn set_default_response(&self, response: ScriptedResponse) {
        self.inner.lock().default = Some(response);
    }

    /// All recorded calls, in dispatch order.
    pub fn calls(&self) -> Vec<DispatchCall> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().calls.len()
    }
}

#[async_trait]
impl AgentDispatcher for FakeDispatcher {
    async fn dispatch(&self, request: DispatchRequest) -> Result<MessageStream, DispatchError> {
        let response = {
            let mut state = self.inner.lock();
            state.calls.push(DispatchCall {
                prompt: request.prompt.clone(),
                system_prompt: request.options.system_prompt.clone(),
                model: request.options.model.clone(),
                allowed_tools: request.options.allowed_tools.clone(),
                has_output_schema: request.options.output_schema.is_some(),
            });
            state
                .script
                .pop_front()
                .or_else(|| state.default.clone())
                .unwrap_or(ScriptedResponse::Success(Value::Object(Default::default())))
        };

        let result = response.into_result()?;
        let (tx, rx) = mpsc::channel(4);
        let _ = tx
            .send(AgentMessage::System {
                subtype: Some("init".to_string()),
            })
            .await;
        let _ = tx.send(AgentMessage::Result(result)).await;
        Ok(rx)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
