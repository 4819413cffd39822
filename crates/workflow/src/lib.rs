// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-workflow: workflow, agent, and prompt definitions
//!
//! Loads and validates the three document kinds the engine consumes:
//! YAML workflow documents (phases over a recursive step tree), markdown
//! agent documents (YAML frontmatter), and markdown prompt documents
//! (template body). Also home to the condition expression language, the
//! `{{name}}` template renderer, the two-tier document resolver, and the
//! structured-output schema registry.

pub mod condition;
pub mod document;
pub mod error;
pub mod resolver;
pub mod schema;
pub mod step;
pub mod template;
pub mod workflow;

pub use document::{AgentDoc, LegacyAgentDoc, PromptDoc};
pub use error::LoadError;
pub use resolver::{DocKind, DocResolver, ResolvedDoc, SourceTier};
pub use schema::SchemaRegistry;
pub use step::{
    AgentStepDef, CodeStepDef, LegacyAgentStepDef, LoopStepDef, OnExhausted, ParallelStepDef,
    PerTaskStepDef, StepDef, StepInput,
};
pub use workflow::{WorkflowDef, WorkflowDefaults};
