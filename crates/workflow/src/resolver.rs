// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-tier document resolution
//!
//! Logical names resolve to files in two tiers: a project override under
//! `<project>/.foreman/`, then the plugin's builtin documents. Every
//! resolved path is canonicalized and checked against its root so neither
//! crafted names nor symlinks can escape the permitted directories.

use crate::error::LoadError;
use std::fmt;
use std::path::{Path, PathBuf};

/// The directory layout name under the project override dir.
pub const PROJECT_DIR: &str = ".foreman";

/// Document kinds the resolver knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Workflows,
    Agents,
    Prompts,
}

impl DocKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            DocKind::Workflows => "workflows",
            DocKind::Agents => "agents",
            DocKind::Prompts => "prompts",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocKind::Workflows => "yaml",
            DocKind::Agents | DocKind::Prompts => "md",
        }
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Which tier a document resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTier {
    Project,
    Builtin,
}

/// A resolved document location.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDoc {
    pub path: PathBuf,
    pub source: SourceTier,
}

/// Resolves logical document names against project and plugin roots.
#[derive(Debug, Clone)]
pub struct DocResolver {
    plugin_root: PathBuf,
    project_root: Option<PathBuf>,
}

impl DocResolver {
    pub fn new(plugin_root: impl Into<PathBuf>) -> Self {
        Self {
            plugin_root: plugin_root.into(),
            project_root: None,
        }
    }

    pub fn with_project_root(mut self, project_root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(project_root.into());
        self
    }

    /// Resolve a logical name to a file, project tier first.
    pub fn resolve(&self, kind: DocKind, name: &str) -> Result<ResolvedDoc, LoadError> {
        validate_name(name)?;

        let mut candidates = Vec::new();
        if let Some(project) = &self.project_root {
            let root = project.join(PROJECT_DIR).join(kind.dir_name());
            let candidate = root.join(format!("{name}.{}", kind.extension()));
            if candidate.is_file() {
                tracing::debug!(kind = %kind, name, "resolved from project override");
                return Ok(ResolvedDoc {
                    path: contained(&candidate, &root)?,
                    source: SourceTier::Project,
                });
            }
            candidates.push(candidate);
        }

        let root = self.plugin_root.join(kind.dir_name());
        let candidate = root.join(format!("{name}.{}", kind.extension()));
        if candidate.is_file() {
            return Ok(ResolvedDoc {
                path: contained(&candidate, &root)?,
                source: SourceTier::Builtin,
            });
        }
        candidates.push(candidate);

        Err(LoadError::NotFound {
            kind: kind.dir_name(),
            name: name.to_string(),
            candidates,
        })
    }

    /// Enumerate document names visible for a kind, project overrides
    /// shadowing builtins of the same name.
    pub fn list(&self, kind: DocKind) -> Vec<(String, SourceTier)> {
        let mut entries: Vec<(String, SourceTier)> = Vec::new();
        if let Some(project) = &self.project_root {
            let dir = project.join(PROJECT_DIR).join(kind.dir_name());
            for name in names_in(&dir, kind.extension()) {
                entries.push((name, SourceTier::Project));
            }
        }
        for name in names_in(&self.plugin_root.join(kind.dir_name()), kind.extension()) {
            if !entries.iter().any(|(n, _)| n == &name) {
                entries.push((name, SourceTier::Builtin));
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

/// Resolve a relative path under a base directory, rejecting escapes.
///
/// Used for legacy agent steps, whose `agent` field is a path relative to
/// the workflow document's directory.
pub fn resolve_under_base(base: &Path, relative: &str) -> Result<PathBuf, LoadError> {
    let joined = base.join(relative);
    if !joined.is_file() {
        return Err(LoadError::NotFound {
            kind: "agents",
            name: relative.to_string(),
            candidates: vec![joined],
        });
    }
    contained(&joined, base)
}

/// Canonicalize `path` and require it to stay under `root` (also
/// canonicalized, so symlinked escapes are caught).
fn contained(path: &Path, root: &Path) -> Result<PathBuf, LoadError> {
    let canonical = path.canonicalize().map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let canonical_root = root.canonicalize().map_err(|source| LoadError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    if !canonical.starts_with(&canonical_root) {
        return Err(LoadError::Traversal {
            path: path.to_path_buf(),
        });
    }
    Ok(canonical)
}

/// A document name is a bare file stem: no separators, no traversal.
fn validate_name(name: &str) -> Result<(), LoadError> {
    let ok = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !name.contains("..");
    if ok {
        Ok(())
    } else {
        Err(LoadError::InvalidName(name.to_string()))
    }
}

fn names_in(dir: &Path, extension: &str) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
