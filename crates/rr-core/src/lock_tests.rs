// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;

fn token() -> LockToken {
    LockToken::new(
        ProjectFingerprint::of(Path::new("/tmp/proj")),
        "build01",
        "riley@laptop:4821",
        1_000,
        Duration::from_secs(600),
        "/var/lib/rr/locks/proj.lock",
    )
}

#[test]
fn new_sets_refresh_deadline_from_timeout() {
    let t = token();
    assert_eq!(t.refresh_deadline_ms, 601_000);
}

#[test]
fn is_expired_requires_deadline_plus_grace() {
    let t = token();
    let grace = Duration::from_secs(15);
    assert!(!t.is_expired(601_000, grace));
    assert!(!t.is_expired(615_999, grace));
    assert!(t.is_expired(616_000, grace));
}

#[test]
fn renew_pushes_deadline_forward_by_timeout() {
    let mut t = token();
    t.renew(620_000, Duration::from_secs(600));
    assert_eq!(t.refresh_deadline_ms, 1_220_000);
}
