// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn ok_result_has_zero_free_latency_and_no_reason() {
    let r = ProbeResult::ok("lan", Duration::from_millis(12));
    assert!(r.outcome.is_ok());
    assert_eq!(r.latency, Duration::from_millis(12));
    assert!(r.reason.is_none());
}

#[test]
fn failed_result_has_zero_latency() {
    let r = ProbeResult::failed("vpn", ProbeOutcome::Timeout, "deadline elapsed");
    assert!(!r.outcome.is_ok());
    assert_eq!(r.latency, Duration::ZERO);
    assert_eq!(r.reason.as_deref(), Some("deadline elapsed"));
}

#[test]
fn display_matches_wire_format() {
    assert_eq!(ProbeOutcome::HostKeyMismatch.to_string(), "host-key-mismatch");
    assert_eq!(ProbeOutcome::DnsFailure.to_string(), "dns-failure");
}

#[test]
fn serializes_as_kebab_case() {
    let json = serde_json::to_string(&ProbeOutcome::AuthFailed).unwrap();
    assert_eq!(json, "\"auth-failed\"");
}
