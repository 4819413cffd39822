// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! fm-adapters: LLM dispatch boundary
//!
//! The engine treats the LLM as a black-box callable that streams
//! messages for a given prompt and options. This crate defines that
//! contract ([`AgentDispatcher`]) plus the one production adapter, a
//! `claude` CLI subprocess speaking `--output-format stream-json`.

pub mod claude;
pub mod dispatcher;
pub mod message;

pub use claude::ClaudeDispatcher;
pub use dispatcher::{
    collect_result, AgentDispatcher, DispatchError, DispatchOptions, DispatchRequest,
    MessageStream,
};
pub use message::{AgentMessage, ResultMessage};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{DispatchCall, FakeDispatcher, ScriptedResponse};
