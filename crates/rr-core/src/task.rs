// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task declaration data model (§3, §9 — "polymorphic" commands expressed as
//! a tagged variant, not subclassing).

use serde::{Deserialize, Serialize};

/// What to do when a step in a sequential list fails (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFail {
    Abort,
    Continue,
}

impl Default for OnFail {
    fn default() -> Self {
        OnFail::Abort
    }
}

/// One step in an ordered step list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub on_fail: OnFail,
}

/// A dependency edge: either a single predecessor task or a parallel group
/// of sibling task names that all depend on the same upstream edges (§3, §4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependsEdge {
    Single(String),
    ParallelGroup(Vec<String>),
}

impl DependsEdge {
    /// All task names touched by this edge.
    pub fn task_names(&self) -> Vec<&str> {
        match self {
            DependsEdge::Single(name) => vec![name.as_str()],
            DependsEdge::ParallelGroup(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// The polymorphic body of a task: a single command, an ordered step list, a
/// parallel list of other task names, or a pure orchestrator with only `depends`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskBody {
    Run(String),
    Steps(Vec<Step>),
    Parallel(Vec<String>),
    Orchestrator,
}

/// A declared task, keyed by name within configuration (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    #[serde(default)]
    pub description: Option<String>,
    pub body: TaskBody,
    /// Restrict this task to hosts matching these names or tags. Empty means
    /// no restriction.
    #[serde(default)]
    pub host_restriction: Vec<String>,
    #[serde(default)]
    pub fail_fast: bool,
    /// `None` means "number of children" (§4.7).
    #[serde(default)]
    pub max_parallel: Option<usize>,
    #[serde(default)]
    pub depends: Vec<DependsEdge>,
}

impl TaskSpec {
    pub fn orchestrator(depends: Vec<DependsEdge>) -> Self {
        Self {
            description: None,
            body: TaskBody::Orchestrator,
            host_restriction: Vec::new(),
            fail_fast: false,
            max_parallel: None,
            depends,
        }
    }

    pub fn run(command: impl Into<String>) -> Self {
        Self {
            description: None,
            body: TaskBody::Run(command.into()),
            host_restriction: Vec::new(),
            fail_fast: false,
            max_parallel: None,
            depends: Vec::new(),
        }
    }

    /// Effective fan-out width for a `parallel` body (§4.7 default = number of children).
    pub fn effective_max_parallel(&self) -> usize {
        match (&self.body, self.max_parallel) {
            (_, Some(n)) => n.max(1),
            (TaskBody::Parallel(children), None) => children.len().max(1),
            _ => 1,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
