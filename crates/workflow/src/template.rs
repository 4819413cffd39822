// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt template rendering
//!
//! Substitutes `{{name}}` tokens from a variable map. Placeholders are
//! single identifiers; dot-path resolution happens in the step wiring
//! layer, which injects resolved values under their leaf names before
//! rendering.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Regex pattern for {{variable_name}} tokens.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
pub static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\}\}").expect("constant regex pattern is valid")
});

/// Render `{{name}}` placeholders from the vars map.
///
/// Unknown names render as the empty string. Strings substitute verbatim;
/// other values substitute as their compact JSON rendering.
pub fn render(template: &str, vars: &IndexMap<String, Value>) -> String {
    TOKEN_PATTERN
        .replace_all(template, |caps: &regex::Captures| {
            match vars.get(&caps[1]) {
                Some(value) => render_value(value),
                None => String::new(),
            }
        })
        .to_string()
}

/// The string form of a variable when injected into a prompt.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
