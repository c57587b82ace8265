// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rr_adapters::Selector;
use rr_core::{HostEntry, ProjectFingerprint};
use tempfile::tempdir;

fn unreachable_pool() -> IndexMap<String, HostEntry> {
    let mut hosts = IndexMap::new();
    hosts.insert("build01".to_string(), HostEntry::new(vec!["127.0.0.1:1".into()], "/srv/build01"));
    hosts
}

#[tokio::test]
async fn falls_back_to_local_and_skips_sync_and_lock() {
    let selector = Selector::new(Duration::from_secs(60));
    let fingerprint = ProjectFingerprint::of(&std::env::temp_dir());
    let local_root = tempdir().unwrap();
    let (sink, mut rx) = mpsc::channel(64);

    let opts = WorkflowOptions {
        probe_timeout: Duration::from_millis(200),
        ..WorkflowOptions::default()
    };

    let report = Workflow::run(
        &selector,
        &unreachable_pool(),
        &fingerprint,
        "test-holder",
        local_root.path(),
        &SyncRules::default(),
        LockPolicy { timeout: Duration::from_secs(5), grace: Duration::from_secs(5) },
        0,
        "echo hi",
        &HashMap::new(),
        None,
        &opts,
        sink,
        CancellationToken::new(),
    )
    .await;

    // Selection fails outright because no local fallback was requested and
    // the single alias is unreachable.
    assert!(report.is_err());
    while rx.try_recv().is_ok() {}
}

#[test]
fn phase_outcome_ran_reports_true() {
    let ran: PhaseOutcome<()> = PhaseOutcome::Ran(());
    let skipped: PhaseOutcome<()> = PhaseOutcome::Skipped("reason");
    assert!(ran.ran());
    assert!(!skipped.ran());
}

#[test]
fn report_exit_code_prefers_command_result_over_error() {
    let mut report = WorkflowReport::new("build01".to_string());
    report.command_result = Some(CommandResult {
        exit_code: 3,
        stdout: String::new(),
        stderr: String::new(),
        duration: Duration::ZERO,
    });
    report.error = Some(RrError::config("unreachable in this path"));
    assert_eq!(report.exit_code(), 3);
}

#[test]
fn report_exit_code_falls_back_to_error_mapping() {
    let mut report = WorkflowReport::new("build01".to_string());
    report.error = Some(RrError::config("bad config"));
    assert_eq!(report.exit_code(), exit_code::CONFIG_INVALID);
}

#[test]
fn report_exit_code_is_zero_with_no_error_or_result() {
    let report = WorkflowReport::new("build01".to_string());
    assert_eq!(report.exit_code(), exit_code::SUCCESS);
}
