// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rr_core::{DependsEdge, TaskBody, TaskSpec};

fn task(body: TaskBody, depends: Vec<DependsEdge>) -> TaskSpec {
    TaskSpec { description: None, body, host_restriction: Vec::new(), fail_fast: false, max_parallel: None, depends }
}

fn leaf() -> TaskSpec {
    task(TaskBody::Run("true".into()), Vec::new())
}

#[test]
fn single_task_with_no_depends_is_one_node_plan() {
    let mut tasks = IndexMap::new();
    tasks.insert("root".to_string(), leaf());
    let plan = resolve("root", &tasks).unwrap();
    assert_eq!(plan, vec![PlanNode::Task("root".to_string())]);
}

#[test]
fn linear_chain_orders_predecessors_first() {
    let mut tasks = IndexMap::new();
    tasks.insert("a".to_string(), leaf());
    tasks.insert("b".to_string(), task(TaskBody::Run("true".into()), vec![DependsEdge::Single("a".into())]));
    let plan = resolve("b", &tasks).unwrap();
    assert_eq!(plan, vec![PlanNode::Task("a".to_string()), PlanNode::Task("b".to_string())]);
}

#[test]
fn diamond_runs_siblings_concurrently_and_leaf_exactly_once() {
    let mut tasks = IndexMap::new();
    tasks.insert("root".to_string(), leaf());
    tasks.insert("a".to_string(), task(TaskBody::Run("true".into()), vec![DependsEdge::Single("root".into())]));
    tasks.insert("b".to_string(), task(TaskBody::Run("true".into()), vec![DependsEdge::Single("root".into())]));
    tasks.insert(
        "leaf".to_string(),
        task(TaskBody::Run("true".into()), vec![DependsEdge::ParallelGroup(vec!["a".into(), "b".into()])]),
    );

    let plan = resolve("leaf", &tasks).unwrap();
    assert_eq!(plan.len(), 3);
    assert_eq!(plan[0], PlanNode::Task("root".to_string()));
    match &plan[1] {
        PlanNode::Group(names) => {
            let mut names = names.clone();
            names.sort();
            assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("expected a group, got {other:?}"),
    }
    assert_eq!(plan[2], PlanNode::Task("leaf".to_string()));
}

#[test]
fn direct_cycle_is_rejected() {
    let mut tasks = IndexMap::new();
    tasks.insert("a".to_string(), task(TaskBody::Run("true".into()), vec![DependsEdge::Single("b".into())]));
    tasks.insert("b".to_string(), task(TaskBody::Run("true".into()), vec![DependsEdge::Single("a".into())]));
    let err = resolve("a", &tasks).unwrap_err();
    assert!(err.message.contains("cycle"));
}

#[test]
fn self_cycle_is_rejected() {
    let mut tasks = IndexMap::new();
    tasks.insert("a".to_string(), task(TaskBody::Run("true".into()), vec![DependsEdge::Single("a".into())]));
    let err = resolve("a", &tasks).unwrap_err();
    assert!(err.message.contains("cycle"));
}

#[test]
fn unknown_root_task_is_rejected() {
    let tasks: IndexMap<String, TaskSpec> = IndexMap::new();
    let err = resolve("missing", &tasks).unwrap_err();
    assert!(err.message.contains("unknown task"));
}

#[test]
fn unknown_dependency_is_rejected() {
    let mut tasks = IndexMap::new();
    tasks.insert("a".to_string(), task(TaskBody::Run("true".into()), vec![DependsEdge::Single("ghost".into())]));
    let err = resolve("a", &tasks).unwrap_err();
    assert!(err.message.contains("unknown task"));
}

#[test]
fn diamond_with_shared_grandparent_schedules_leaf_once() {
    let mut tasks = IndexMap::new();
    tasks.insert("root".to_string(), leaf());
    tasks.insert("a".to_string(), task(TaskBody::Run("true".into()), vec![DependsEdge::Single("root".into())]));
    tasks.insert(
        "b".to_string(),
        task(
            TaskBody::Run("true".into()),
            vec![DependsEdge::Single("root".into()), DependsEdge::Single("a".into())],
        ),
    );
    let plan = resolve("b", &tasks).unwrap();
    // root, then a, then b: b also depends directly on root but that edge is
    // already satisfied once root has run.
    assert_eq!(
        plan,
        vec![PlanNode::Task("root".to_string()), PlanNode::Task("a".to_string()), PlanNode::Task("b".to_string())]
    );
}
