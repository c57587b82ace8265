// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_project_config_has_sensible_defaults() {
    let cfg = ProjectConfig::empty();
    assert!(cfg.hosts.is_empty());
    assert_eq!(cfg.probe_timeout, Duration::from_secs(5));
    assert!(cfg.lock.enabled);
}

#[test]
fn lock_policy_default_grace_is_less_than_timeout() {
    let policy = LockPolicy::default();
    assert!(policy.grace < policy.timeout);
}

#[test]
fn project_config_round_trips_through_json() {
    let mut cfg = ProjectConfig::empty();
    cfg.hosts.insert(
        "build-box".to_string(),
        HostEntry::new(vec!["build.lan".to_string()], "${HOME}/proj"),
    );
    let json = serde_json::to_string(&cfg).unwrap();
    let back: ProjectConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cfg);
}

#[test]
fn retention_policy_defaults_to_unbounded() {
    let policy = RetentionPolicy::default();
    assert!(policy.max_size_mb.is_none());
    assert!(policy.keep_days.is_none());
    assert!(policy.keep_runs.is_none());
}
