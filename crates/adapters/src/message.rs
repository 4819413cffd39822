// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream-json message model
//!
//! One JSON object per line. The engine only acts on the terminal
//! `result` message; everything else is progress it may log or ignore.

use serde::Deserialize;
use serde_json::Value;

/// A message from the agent's output stream.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentMessage {
    System { subtype: Option<String> },
    Assistant { content: Value },
    User { content: Value },
    Result(ResultMessage),
}

/// The terminal message of a dispatch.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResultMessage {
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub structured_output: Option<Value>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ResultMessage {
    pub fn success(structured_output: Value) -> Self {
        Self {
            subtype: "success".to_string(),
            structured_output: Some(structured_output),
            ..Self::default()
        }
    }

    pub fn failure(subtype: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            subtype: subtype.into(),
            is_error: true,
            errors,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.subtype == "success" && !self.is_error
    }

    /// Aggregate whatever error detail the result carries into one string.
    pub fn error_summary(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(result) = &self.result {
            if !result.is_empty() {
                parts.push(result.clone());
            }
        }
        parts.extend(self.errors.iter().cloned());
        if parts.is_empty() {
            self.subtype.clone()
        } else {
            format!("{}: {}", self.subtype, parts.join("; "))
        }
    }
}

impl AgentMessage {
    /// Parse one stream line. Unknown message types and malformed lines
    /// yield `None`; the stream reader skips them.
    pub fn parse_line(line: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(line.trim()).ok()?;
        match value.get("type")?.as_str()? {
            "system" => Some(AgentMessage::System {
                subtype: value
                    .get("subtype")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
            "assistant" => Some(AgentMessage::Assistant {
                content: value.get("message").cloned().unwrap_or(Value::Null),
            }),
            "user" => Some(AgentMessage::User {
                content: value.get("message").cloned().unwrap_or(Value::Null),
            }),
            "result" => serde_json::from_value(value).ok().map(AgentMessage::Result),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
