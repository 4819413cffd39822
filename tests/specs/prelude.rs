//! Test helpers for behavioral specifications.
//!
//! Builds throwaway plugin roots (workflow/agent/prompt documents) and
//! engines wired to the fake dispatcher and in-memory session sink.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use fm_adapters::FakeDispatcher;
use fm_core::RunId;
use fm_engine::{Engine, HandlerRegistry, RunConfig};
use fm_storage::MemorySessionSink;
use fm_workflow::DocResolver;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway project: a plugin root for builtin documents and a
/// project root for overrides and engine output.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn plugin_root(&self) -> PathBuf {
        self.dir.path().join("plugin")
    }

    pub fn project_root(&self) -> PathBuf {
        self.dir.path().join("project")
    }

    /// Write a file under the plugin root.
    pub fn plugin_file(&self, rel: &str, content: &str) -> &Self {
        write(&self.plugin_root().join(rel), content);
        self
    }

    /// Write a file under the project root.
    pub fn project_file(&self, rel: &str, content: &str) -> &Self {
        write(&self.project_root().join(rel), content);
        self
    }

    pub fn resolver(&self) -> DocResolver {
        DocResolver::new(self.plugin_root()).with_project_root(self.project_root())
    }

    pub fn config(&self) -> RunConfig {
        RunConfig {
            working_dir: self.project_root(),
            project_root: self.project_root(),
            ..RunConfig::default()
        }
    }

    /// Engine wired to fakes, run id `run-1`.
    pub fn engine(&self) -> TestEngine {
        self.engine_with(self.config(), HandlerRegistry::with_builtins())
    }

    pub fn engine_with(&self, config: RunConfig, registry: HandlerRegistry) -> TestEngine {
        std::fs::create_dir_all(self.project_root()).unwrap();
        let dispatcher = FakeDispatcher::new();
        let sink = MemorySessionSink::new();
        let engine = Engine::new(dispatcher.clone(), sink.clone(), config)
            .with_resolver(self.resolver())
            .with_registry(registry)
            .with_run_id(RunId::new("run-1"));
        TestEngine {
            engine,
            dispatcher,
            sink,
        }
    }
}

/// An engine under test plus handles on its fake collaborators (the
/// fakes share state with their clones inside the engine).
pub struct TestEngine {
    pub engine: Engine<FakeDispatcher, MemorySessionSink>,
    pub dispatcher: FakeDispatcher,
    pub sink: MemorySessionSink,
}

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Standard documents most scenarios share.
pub const ANALYST_AGENT: &str = "---\nsystemPrompt: |\n  You decompose specifications into independently implementable tasks.\ntools:\n  - Read\n  - Grep\noutputSchema: task-analysis\n---\n";

pub const IMPLEMENTER_AGENT: &str = "---\nsystemPrompt: |\n  You implement one task at a time.\noutputSchema: implementation-report\n---\n";

pub const REVIEWER_AGENT: &str = "---\nsystemPrompt: |\n  You review changes and report actionable issues.\noutputSchema: review-findings\n---\n";

pub const ANALYZE_PROMPT: &str = "Analyze the specification at {{specPath}}.\n";

pub const IMPLEMENT_PROMPT: &str = "Implement this task: {{task}}\n";

pub const REVIEW_PROMPT: &str = "Review the changes for task {{task}}.\n";

/// Install the standard documents into a project's plugin root.
pub fn with_standard_docs(project: &Project) {
    project
        .plugin_file("agents/analyst.md", ANALYST_AGENT)
        .plugin_file("agents/implementer.md", IMPLEMENTER_AGENT)
        .plugin_file("agents/reviewer.md", REVIEWER_AGENT)
        .plugin_file("prompts/analyze-spec.md", ANALYZE_PROMPT)
        .plugin_file("prompts/implement-task.md", IMPLEMENT_PROMPT)
        .plugin_file("prompts/review-changes.md", REVIEW_PROMPT);
}

/// Path to the fm binary, or None when it has not been built (CLI specs
/// skip themselves in that case rather than failing the suite).
pub fn fm_binary() -> Option<PathBuf> {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let standard = manifest_dir.join("target/debug/fm");
    if standard.exists() {
        return Some(standard);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join("fm");
            if fallback.exists() {
                return Some(fallback);
            }
        }
    }
    None
}

/// A Command for the fm binary, if built.
pub fn fm_cmd() -> Option<assert_cmd::Command> {
    fm_binary().map(assert_cmd::Command::new)
}
