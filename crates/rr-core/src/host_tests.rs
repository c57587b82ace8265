// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn has_alias_false_for_empty_list() {
    let entry = HostEntry::new(vec![], "~/proj");
    assert!(!entry.has_alias());
}

#[test]
fn has_alias_true_for_one_alias() {
    let entry = HostEntry::new(vec!["lan.local".to_string()], "~/proj");
    assert!(entry.has_alias());
}

#[test]
fn has_tag_checks_membership() {
    let mut entry = HostEntry::new(vec!["lan.local".to_string()], "~/proj");
    entry.tags.push("gpu".to_string());
    assert!(entry.has_tag("gpu"));
    assert!(!entry.has_tag("arm"));
}
