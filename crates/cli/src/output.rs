// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result rendering for the terminal

use fm_core::{RunId, WorkflowResult, WorkflowStatus};

/// Print a terminal result summary: status, phases, changed files, and
/// (for pauses) the blocker plus the exact resume invocation.
pub fn print_result(result: &WorkflowResult, run_id: &RunId) {
    match result.status {
        WorkflowStatus::Completed => println!("status: completed"),
        WorkflowStatus::Failed => {
            println!("status: failed");
            if let Some(error) = &result.error {
                println!("error: {error}");
            }
        }
        WorkflowStatus::Paused => {
            println!("status: paused");
            if let Some(phase) = &result.paused_at_phase {
                println!("paused at phase: {phase}");
            }
            if let Some(blocker) = &result.blocker_details {
                println!("blocker: {blocker}");
            }
            if let Some(phase) = &result.paused_at_phase {
                println!("resume with: fm resume --checkpoint {run_id} --phase {phase}");
            }
        }
    }

    if !result.completed_phases.is_empty() {
        println!("completed phases: {}", result.completed_phases.join(", "));
    }
    if !result.changed_files.is_empty() {
        println!("changed files:");
        for file in &result.changed_files {
            println!("  {file}");
        }
    }
}
