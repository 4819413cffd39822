// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors raised while loading and validating definitions

use std::path::PathBuf;
use thiserror::Error;

/// Errors from document loading, validation, and resolution.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid workflow {}: {}", path.display(), errors.join("; "))]
    Invalid { path: PathBuf, errors: Vec<String> },

    #[error("missing or invalid frontmatter in {}", path.display())]
    Frontmatter { path: PathBuf },

    #[error("{kind} document '{name}' not found (checked: {})", candidates_display(candidates))]
    NotFound {
        kind: &'static str,
        name: String,
        candidates: Vec<PathBuf>,
    },

    #[error("invalid document name '{0}'")]
    InvalidName(String),

    #[error("path escapes permitted root: {}", path.display())]
    Traversal { path: PathBuf },

    #[error("unknown output schema '{0}'")]
    UnknownSchema(String),
}

fn candidates_display(candidates: &[PathBuf]) -> String {
    candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
