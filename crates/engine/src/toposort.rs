// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topological task ordering
//!
//! Depth-first sort over `(id, dependencies)`. Input order is preserved
//! among independent tasks; a dependency cycle is an error naming the
//! cycle. Dependency ids that match no task are ignored, since they
//! cannot constrain ordering.

use fm_core::Task;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("circular task dependency: {}", path.join(" -> "))]
pub struct CycleError {
    pub path: Vec<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

pub fn sort(tasks: Vec<Task>) -> Result<Vec<Task>, CycleError> {
    let index: HashMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), i))
        .collect();
    let mut marks = vec![Mark::Unvisited; tasks.len()];
    let mut order: Vec<usize> = Vec::with_capacity(tasks.len());

    for i in 0..tasks.len() {
        visit(i, &tasks, &index, &mut marks, &mut order, &mut Vec::new())?;
    }

    let mut by_index: Vec<Option<Task>> = tasks.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|i| by_index[i].take())
        .collect())
}

fn visit(
    i: usize,
    tasks: &[Task],
    index: &HashMap<&str, usize>,
    marks: &mut [Mark],
    order: &mut Vec<usize>,
    trail: &mut Vec<String>,
) -> Result<(), CycleError> {
    match marks[i] {
        Mark::Done => return Ok(()),
        Mark::InProgress => {
            let mut path = trail.clone();
            path.push(tasks[i].id.clone());
            return Err(CycleError { path });
        }
        Mark::Unvisited => {}
    }
    marks[i] = Mark::InProgress;
    trail.push(tasks[i].id.clone());
    for dep in &tasks[i].dependencies {
        if let Some(&dep_index) = index.get(dep.as_str()) {
            visit(dep_index, tasks, index, marks, order, trail)?;
        }
    }
    trail.pop();
    marks[i] = Mark::Done;
    order.push(i);
    Ok(())
}

#[cfg(test)]
#[path = "toposort_tests.rs"]
mod tests;
