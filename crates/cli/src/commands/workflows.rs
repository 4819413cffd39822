// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fm workflows`

use crate::Roots;
use anyhow::Result;
use clap::Args;
use fm_workflow::{DocKind, SourceTier};

#[derive(Args)]
pub struct WorkflowsArgs {}

pub fn execute(roots: &Roots, _args: WorkflowsArgs) -> Result<()> {
    let resolver = roots.resolver();
    let entries = resolver.list(DocKind::Workflows);
    if entries.is_empty() {
        println!(
            "no workflows found under {} or {}",
            roots.project_root.join(".foreman/workflows").display(),
            roots.plugin_root.join("workflows").display()
        );
        return Ok(());
    }
    for (name, source) in entries {
        let tier = match source {
            SourceTier::Project => "project",
            SourceTier::Builtin => "builtin",
        };
        println!("{name:<30} {tier}");
    }
    Ok(())
}
