// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fm validate`

use crate::Roots;
use anyhow::{bail, Result};
use clap::Args;
use fm_workflow::{AgentDoc, DocKind, PromptDoc, SchemaRegistry, StepDef, WorkflowDef};

#[derive(Args)]
pub struct ValidateArgs {
    /// Workflow name to validate
    pub workflow: String,
}

pub fn execute(roots: &Roots, args: ValidateArgs) -> Result<()> {
    let resolver = roots.resolver();
    let resolved = resolver.resolve(DocKind::Workflows, &args.workflow)?;

    // Structural problems are collected rather than first-error-wins
    let text = std::fs::read_to_string(&resolved.path)?;
    let def: WorkflowDef = match serde_yaml::from_str(&text) {
        Ok(def) => def,
        Err(e) => bail!("{}: {e}", resolved.path.display()),
    };

    let mut problems = def.validate();
    check_documents(&resolver, &def.phases, def.defaults.as_ref(), &mut problems);

    if problems.is_empty() {
        println!(
            "{}: ok ({} phases, {:?})",
            args.workflow,
            def.phases.len(),
            resolved.source
        );
        Ok(())
    } else {
        for problem in &problems {
            eprintln!("error: {problem}");
        }
        bail!("{} problem(s) in workflow '{}'", problems.len(), args.workflow);
    }
}

/// Resolve and parse every referenced agent and prompt document, and
/// check output-schema references against the builtin registry.
fn check_documents(
    resolver: &fm_workflow::DocResolver,
    steps: &[StepDef],
    defaults: Option<&fm_workflow::WorkflowDefaults>,
    problems: &mut Vec<String>,
) {
    let schemas = SchemaRegistry::with_builtins();
    for step in steps {
        match step {
            StepDef::Agent(s) => {
                let agent_name = s
                    .agent
                    .as_deref()
                    .or(defaults.and_then(|d| d.agent.as_deref()));
                match agent_name {
                    None => problems.push(format!(
                        "step '{}': no agent named and no default agent",
                        s.name
                    )),
                    Some(name) => match resolver.resolve(DocKind::Agents, name) {
                        Err(e) => problems.push(format!("step '{}': {e}", s.name)),
                        Ok(doc) => match AgentDoc::load(&doc.path) {
                            Err(e) => problems.push(format!("step '{}': {e}", s.name)),
                            Ok(agent) => {
                                if let Some(id) = &agent.output_schema {
                                    if schemas.get(id).is_none() {
                                        problems.push(format!(
                                            "step '{}': unknown output schema '{id}'",
                                            s.name
                                        ));
                                    }
                                }
                            }
                        },
                    },
                }
                match resolver.resolve(DocKind::Prompts, &s.prompt) {
                    Err(e) => problems.push(format!("step '{}': {e}", s.name)),
                    Ok(doc) => {
                        if let Err(e) = PromptDoc::load(&doc.path) {
                            problems.push(format!("step '{}': {e}", s.name));
                        }
                    }
                }
            }
            _ => {
                if let Some(children) = step.children() {
                    check_documents(resolver, children, defaults, problems);
                }
            }
        }
    }
}
