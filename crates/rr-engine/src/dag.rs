// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency resolution for the task DAG (§4.7). Only `depends` edges
//! participate in scheduling; a `parallel` task body's children are
//! resolved recursively by the engine at the moment that task runs.

use indexmap::IndexMap;
use rr_core::{RrError, TaskSpec};
use std::collections::{HashMap, HashSet};

/// One step of the topological execution plan: a single task, or a set of
/// siblings that became ready at the same point and run concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanNode {
    Task(String),
    Group(Vec<String>),
}

/// Resolve `root`'s transitive `depends` graph into an ordered execution
/// plan. Rejects unknown task names and dependency cycles.
pub fn resolve(root: &str, tasks: &IndexMap<String, TaskSpec>) -> Result<Vec<PlanNode>, RrError> {
    if !tasks.contains_key(root) {
        return Err(unknown_task(root));
    }

    let reachable = collect_reachable(root, tasks)?;
    let predecessors = build_predecessor_map(&reachable, tasks);
    detect_cycle(root, &predecessors)?;
    Ok(layer_schedule(&reachable, &predecessors))
}

fn unknown_task(name: &str) -> RrError {
    RrError::config(format!("unknown task '{name}'"))
}

fn collect_reachable(root: &str, tasks: &IndexMap<String, TaskSpec>) -> Result<IndexMap<String, ()>, RrError> {
    let mut seen: IndexMap<String, ()> = IndexMap::new();
    let mut stack = vec![root.to_string()];
    while let Some(name) = stack.pop() {
        if seen.contains_key(&name) {
            continue;
        }
        let spec = tasks.get(&name).ok_or_else(|| unknown_task(&name))?;
        seen.insert(name.clone(), ());
        for edge in &spec.depends {
            for dep in edge.task_names() {
                if !tasks.contains_key(dep) {
                    return Err(unknown_task(dep));
                }
                if !seen.contains_key(dep) {
                    stack.push(dep.to_string());
                }
            }
        }
    }
    Ok(seen)
}

fn build_predecessor_map(
    reachable: &IndexMap<String, ()>,
    tasks: &IndexMap<String, TaskSpec>,
) -> HashMap<String, Vec<String>> {
    let mut predecessors: HashMap<String, Vec<String>> = HashMap::new();
    for name in reachable.keys() {
        let spec = &tasks[name];
        let mut preds: Vec<String> = Vec::new();
        for edge in &spec.depends {
            for dep in edge.task_names() {
                if !preds.iter().any(|p| p == dep) {
                    preds.push(dep.to_string());
                }
            }
        }
        predecessors.insert(name.clone(), preds);
    }
    predecessors
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

fn detect_cycle(root: &str, predecessors: &HashMap<String, Vec<String>>) -> Result<(), RrError> {
    let mut colors: HashMap<&str, Color> = predecessors.keys().map(|k| (k.as_str(), Color::White)).collect();
    let mut path: Vec<String> = Vec::new();
    visit(root, predecessors, &mut colors, &mut path)
}

fn visit<'a>(
    name: &'a str,
    predecessors: &'a HashMap<String, Vec<String>>,
    colors: &mut HashMap<&'a str, Color>,
    path: &mut Vec<String>,
) -> Result<(), RrError> {
    match colors.get(name).copied().unwrap_or(Color::Black) {
        Color::Black => return Ok(()),
        Color::Gray => {
            path.push(name.to_string());
            return Err(cycle_error(path));
        }
        Color::White => {}
    }
    colors.insert(name, Color::Gray);
    path.push(name.to_string());
    if let Some(preds) = predecessors.get(name) {
        for pred in preds {
            visit(pred, predecessors, colors, path)?;
        }
    }
    path.pop();
    colors.insert(name, Color::Black);
    Ok(())
}

fn cycle_error(path: &[String]) -> RrError {
    let start = path.last().cloned().unwrap_or_default();
    let cycle_start = path.iter().position(|n| *n == start).unwrap_or(0);
    let cycle: Vec<&String> = path[cycle_start..].iter().collect();
    let rendered = cycle.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" -> ");
    RrError::config(format!("dependency cycle detected: {rendered}"))
        .with_details(serde_json::json!({ "cycle": cycle }))
}

/// Kahn-style layering: each round schedules every reachable task whose
/// predecessors have all already been scheduled. A round with more than one
/// ready task becomes a `Group` (the diamond pattern, §9 property 6).
fn layer_schedule(reachable: &IndexMap<String, ()>, predecessors: &HashMap<String, Vec<String>>) -> Vec<PlanNode> {
    let mut scheduled: HashSet<String> = HashSet::new();
    let mut plan = Vec::new();

    while scheduled.len() < reachable.len() {
        let ready: Vec<String> = reachable
            .keys()
            .filter(|name| !scheduled.contains(*name))
            .filter(|name| predecessors[*name].iter().all(|p| scheduled.contains(p)))
            .cloned()
            .collect();

        debug_assert!(!ready.is_empty(), "cycle should have been rejected before scheduling");
        if ready.is_empty() {
            break;
        }

        for name in &ready {
            scheduled.insert(name.clone());
        }
        plan.push(if ready.len() == 1 { PlanNode::Task(ready[0].clone()) } else { PlanNode::Group(ready) });
    }

    plan
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;
