// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn single_edge_yields_one_task_name() {
    let edge = DependsEdge::Single("build".to_string());
    assert_eq!(edge.task_names(), vec!["build"]);
}

#[test]
fn parallel_group_yields_all_names() {
    let edge = DependsEdge::ParallelGroup(vec!["a".to_string(), "b".to_string()]);
    assert_eq!(edge.task_names(), vec!["a", "b"]);
}

#[test]
fn on_fail_defaults_to_abort() {
    assert_eq!(OnFail::default(), OnFail::Abort);
}

#[test]
fn effective_max_parallel_defaults_to_child_count() {
    let spec = TaskSpec {
        description: None,
        body: TaskBody::Parallel(vec!["a".into(), "b".into(), "c".into()]),
        host_restriction: vec![],
        fail_fast: false,
        max_parallel: None,
        depends: vec![],
    };
    assert_eq!(spec.effective_max_parallel(), 3);
}

#[test]
fn effective_max_parallel_honors_explicit_bound() {
    let mut spec = TaskSpec {
        description: None,
        body: TaskBody::Parallel(vec!["a".into(), "b".into(), "c".into()]),
        host_restriction: vec![],
        fail_fast: false,
        max_parallel: Some(2),
        depends: vec![],
    };
    assert_eq!(spec.effective_max_parallel(), 2);
    spec.max_parallel = Some(0);
    assert_eq!(spec.effective_max_parallel(), 1, "zero is clamped to at least one worker");
}

#[test]
fn run_task_builder_has_no_dependencies() {
    let spec = TaskSpec::run("echo hi");
    assert!(spec.depends.is_empty());
    assert_eq!(spec.body, TaskBody::Run("echo hi".to_string()));
}

#[test]
fn orchestrator_body_has_effective_max_parallel_of_one() {
    let spec = TaskSpec::orchestrator(vec![DependsEdge::Single("build".into())]);
    assert_eq!(spec.effective_max_parallel(), 1);
}
