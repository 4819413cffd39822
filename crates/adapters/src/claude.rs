// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude CLI subprocess adapter
//!
//! Spawns `claude -p … --output-format stream-json` per dispatch and
//! forwards each stdout line as a parsed message. Lines that are not
//! valid stream-json are skipped with a warning; if the process exits
//! without ever emitting a `result` message, a synthetic error result is
//! sent so the consumer always observes a terminal message.

use crate::dispatcher::{AgentDispatcher, DispatchError, DispatchRequest, MessageStream};
use crate::message::{AgentMessage, ResultMessage};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Channel capacity for the message stream. Dispatches produce messages
/// far slower than the engine consumes them; this only buffers bursts.
const STREAM_BUFFER: usize = 64;

/// Dispatcher backed by the `claude` CLI.
#[derive(Debug, Clone)]
pub struct ClaudeDispatcher {
    binary: String,
}

impl Default for ClaudeDispatcher {
    fn default() -> Self {
        Self::new("claude")
    }
}

impl ClaudeDispatcher {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Build the CLI argument list for a request.
    fn build_args(request: &DispatchRequest) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
        ];
        let options = &request.options;
        if let Some(system_prompt) = &options.system_prompt {
            args.push("--system-prompt".to_string());
            args.push(system_prompt.clone());
        }
        if let Some(model) = &options.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        if let Some(tools) = &options.allowed_tools {
            if !tools.is_empty() {
                args.push("--allowed-tools".to_string());
                args.extend(tools.iter().cloned());
            }
        }
        if let Some(mode) = &options.permission_mode {
            args.push("--permission-mode".to_string());
            args.push(mode.clone());
        }
        if let Some(sources) = &options.setting_sources {
            if !sources.is_empty() {
                args.push("--setting-sources".to_string());
                args.push(sources.join(","));
            }
        }
        if let Some(schema) = &options.output_schema {
            args.push("--json-schema".to_string());
            args.push(schema.to_string());
        }
        if let Some(servers) = &options.mcp_servers {
            args.push("--mcp-config".to_string());
            args.push(servers.to_string());
        }
        args.push(request.prompt.clone());
        args
    }
}

#[async_trait]
impl AgentDispatcher for ClaudeDispatcher {
    async fn dispatch(&self, request: DispatchRequest) -> Result<MessageStream, DispatchError> {
        let args = Self::build_args(&request);
        let mut command = Command::new(&self.binary);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &request.options.cwd {
            command.current_dir(cwd);
        }

        let mut child = command
            .spawn()
            .map_err(|e| DispatchError::Spawn(format!("{}: {e}", self.binary)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DispatchError::Spawn("stdout not captured".to_string()))?;
        let stderr = child.stderr.take();

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut saw_result = false;
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                match AgentMessage::parse_line(&line) {
                    Some(message) => {
                        saw_result |= matches!(message, AgentMessage::Result(_));
                        if tx.send(message).await.is_err() {
                            // Consumer hung up; stop reading
                            return;
                        }
                    }
                    None => tracing::warn!(line = %line, "skipping unparseable stream line"),
                }
            }

            let status = child.wait().await;
            if !saw_result {
                let mut detail = String::new();
                if let Some(mut stderr) = stderr {
                    let _ = stderr.read_to_string(&mut detail).await;
                }
                let exit = status
                    .ok()
                    .and_then(|s| s.code())
                    .map(|c| format!("exit code {c}"))
                    .unwrap_or_else(|| "killed".to_string());
                tracing::error!(%exit, stderr = %detail, "agent exited without result");
                let result = ResultMessage::failure(
                    "error_process",
                    vec![format!("agent process ended without a result ({exit})")],
                );
                let _ = tx.send(AgentMessage::Result(result)).await;
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
