// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent and prompt documents
//!
//! Agents and prompts are markdown files with YAML frontmatter. A
//! composed dispatch pairs an agent document (frontmatter carries the
//! system prompt, tool restrictions, model, and output-schema reference)
//! with a prompt document (body is the user-message template). A legacy
//! agent document is a single file: same frontmatter, body as template.

use crate::error::LoadError;
use gray_matter::engine::YAML;
use gray_matter::Matter;
use serde::Deserialize;
use std::path::Path;

/// Frontmatter of an agent document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentFrontmatter {
    system_prompt: String,
    #[serde(default)]
    tools: Option<Vec<String>>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    output_schema: Option<String>,
}

/// Frontmatter of a legacy agent document. `systemPrompt` is tolerated for
/// forward compatibility but legacy dispatches never send one.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyFrontmatter {
    #[serde(default)]
    #[allow(dead_code)]
    system_prompt: Option<String>,
    #[serde(default)]
    tools: Option<Vec<String>>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    output_schema: Option<String>,
}

/// An agent: everything needed to configure one LLM dispatch except the
/// user message.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDoc {
    pub system_prompt: String,
    pub tools: Option<Vec<String>>,
    pub model: Option<String>,
    /// Symbolic id resolved through the schema registry.
    pub output_schema: Option<String>,
}

/// A prompt: the user-message template for a composed dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptDoc {
    pub body: String,
}

/// A legacy agent: frontmatter plus the body as the prompt template.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyAgentDoc {
    pub prompt: String,
    pub tools: Option<Vec<String>>,
    pub model: Option<String>,
    pub output_schema: Option<String>,
}

impl AgentDoc {
    pub fn parse(text: &str, path: &Path) -> Result<Self, LoadError> {
        let matter = Matter::<YAML>::new();
        let data = matter
            .parse::<AgentFrontmatter>(text)
            .ok()
            .and_then(|parsed| parsed.data)
            .ok_or_else(|| LoadError::Frontmatter {
                path: path.to_path_buf(),
            })?;
        Ok(Self {
            system_prompt: data.system_prompt,
            tools: data.tools,
            model: data.model,
            output_schema: data.output_schema,
        })
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        Self::parse(&read(path)?, path)
    }
}

impl PromptDoc {
    /// Frontmatter, when present, is skipped; the body is the template.
    pub fn parse(text: &str) -> Self {
        let matter = Matter::<YAML>::new();
        let content = matter
            .parse::<gray_matter::Pod>(text)
            .map(|parsed| parsed.content)
            .unwrap_or_else(|_| text.to_string());
        Self { body: content }
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        Ok(Self::parse(&read(path)?))
    }
}

impl LegacyAgentDoc {
    pub fn parse(text: &str, path: &Path) -> Result<Self, LoadError> {
        let matter = Matter::<YAML>::new();
        let parsed = matter
            .parse::<LegacyFrontmatter>(text)
            .ok()
            .ok_or_else(|| LoadError::Frontmatter {
                path: path.to_path_buf(),
            })?;
        let data = parsed.data.ok_or_else(|| LoadError::Frontmatter {
            path: path.to_path_buf(),
        })?;
        Ok(Self {
            prompt: parsed.content,
            tools: data.tools,
            model: data.model,
            output_schema: data.output_schema,
        })
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        Self::parse(&read(path)?, path)
    }
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
