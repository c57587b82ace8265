// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;

fn entry(name: &str, task: &str, age_secs: u64, size_bytes: u64, now: SystemTime) -> RunEntry {
    RunEntry {
        name: name.to_string(),
        path: PathBuf::from(format!("/runs/{name}")),
        size_bytes,
        modified_at: now - Duration::from_secs(age_secs),
        task: Some(task.to_string()),
    }
}

#[test]
fn keep_runs_deletes_everything_past_the_newest_n_per_task() {
    let now = SystemTime::now();
    let entries = vec![
        entry("deploy-3", "deploy", 0, 10, now),
        entry("deploy-2", "deploy", 10, 10, now),
        entry("deploy-1", "deploy", 20, 10, now),
        entry("build-1", "build", 5, 10, now),
    ];
    let policy = RetentionPolicy { keep_runs: Some(2), ..Default::default() };
    let doomed = select_for_deletion(&entries, &policy, now);
    assert_eq!(doomed, vec![PathBuf::from("/runs/deploy-1")]);
}

#[test]
fn keep_days_deletes_directories_older_than_cutoff() {
    let now = SystemTime::now();
    let entries = vec![entry("old", "deploy", 10 * 86_400, 10, now), entry("new", "deploy", 1 * 86_400, 10, now)];
    let policy = RetentionPolicy { keep_days: Some(5), ..Default::default() };
    let doomed = select_for_deletion(&entries, &policy, now);
    assert_eq!(doomed, vec![PathBuf::from("/runs/old")]);
}

#[test]
fn max_size_mb_deletes_oldest_first_until_under_budget() {
    let now = SystemTime::now();
    let one_mb = 1024 * 1024;
    let entries = vec![
        entry("a", "deploy", 30, 2 * one_mb, now),
        entry("b", "deploy", 20, 2 * one_mb, now),
        entry("c", "deploy", 10, 2 * one_mb, now),
    ];
    let policy = RetentionPolicy { max_size_mb: Some(3), ..Default::default() };
    let doomed = select_for_deletion(&entries, &policy, now);
    assert_eq!(doomed, vec![PathBuf::from("/runs/a")]);
}

#[test]
fn rules_compose_a_directory_is_doomed_if_any_rule_marks_it() {
    let now = SystemTime::now();
    let entries = vec![entry("stale-but-small", "deploy", 10 * 86_400, 1, now)];
    let policy = RetentionPolicy { keep_days: Some(1), max_size_mb: Some(1000), ..Default::default() };
    let doomed = select_for_deletion(&entries, &policy, now);
    assert_eq!(doomed, vec![PathBuf::from("/runs/stale-but-small")]);
}

#[test]
fn no_policy_fields_set_deletes_nothing() {
    let now = SystemTime::now();
    let entries = vec![entry("a", "deploy", 9999, 9999, now)];
    let doomed = select_for_deletion(&entries, &RetentionPolicy::default(), now);
    assert!(doomed.is_empty());
}
