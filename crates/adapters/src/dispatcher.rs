// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher contract

use crate::message::{AgentMessage, ResultMessage};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from agent dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to spawn agent process: {0}")]
    Spawn(String),
    #[error("agent stream ended without a result message")]
    NoResult,
    #[error("agent dispatch failed ({0})")]
    Failed(String),
    #[error("agent result has no structured output")]
    MissingStructuredOutput,
}

/// Options for one dispatch, assembled by the engine from the step, the
/// agent document, and run-wide configuration.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub system_prompt: Option<String>,
    pub allowed_tools: Option<Vec<String>>,
    /// JSON-Schema projection of the required structured output.
    pub output_schema: Option<Value>,
    pub model: Option<String>,
    pub cwd: Option<PathBuf>,
    pub permission_mode: Option<String>,
    /// Opaque MCP server table forwarded to the agent runtime.
    pub mcp_servers: Option<Value>,
    pub setting_sources: Option<Vec<String>>,
}

/// One dispatch: the rendered user message plus options.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub prompt: String,
    pub options: DispatchOptions,
}

/// The stream of messages a dispatch produces.
pub type MessageStream = mpsc::Receiver<AgentMessage>;

/// A black-box LLM callable. Returns quickly with a stream; the terminal
/// `result` message arrives on the stream when the agent session ends.
#[async_trait]
pub trait AgentDispatcher: Send + Sync + 'static {
    async fn dispatch(&self, request: DispatchRequest) -> Result<MessageStream, DispatchError>;
}

/// Drain a message stream to its terminal result.
pub async fn collect_result(mut stream: MessageStream) -> Result<ResultMessage, DispatchError> {
    while let Some(message) = stream.recv().await {
        if let AgentMessage::Result(result) = message {
            return Ok(result);
        }
    }
    Err(DispatchError::NoResult)
}

impl ResultMessage {
    /// The structured output of a successful result, or the dispatch
    /// error the engine should raise.
    pub fn into_structured_output(self) -> Result<Value, DispatchError> {
        if !self.is_success() {
            return Err(DispatchError::Failed(self.error_summary()));
        }
        self.structured_output
            .ok_or(DispatchError::MissingStructuredOutput)
    }
}
