// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock token data model (§3, §4.4).

use crate::fingerprint::ProjectFingerprint;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A held (or previously held) lock's identity and lease state.
///
/// Invariant: at most one holder per (host, project fingerprint) at a time —
/// enforced by the locker's atomic create-if-absent file semantics, not by
/// this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockToken {
    pub project_fingerprint: ProjectFingerprint,
    pub host: String,
    /// Opaque identity of the holder (e.g. `user@hostname:pid`).
    pub holder: String,
    pub acquired_at_ms: u64,
    /// Deadline by which the holder must renew or be considered abandoned.
    pub refresh_deadline_ms: u64,
    /// Opaque path to the lock file on the remote host.
    pub remote_path: String,
}

impl LockToken {
    pub fn new(
        project_fingerprint: ProjectFingerprint,
        host: impl Into<String>,
        holder: impl Into<String>,
        acquired_at_ms: u64,
        timeout: Duration,
        remote_path: impl Into<String>,
    ) -> Self {
        Self {
            project_fingerprint,
            host: host.into(),
            holder: holder.into(),
            acquired_at_ms,
            refresh_deadline_ms: acquired_at_ms + timeout.as_millis() as u64,
            remote_path: remote_path.into(),
        }
    }

    /// Whether `now_ms` is stale: at or past the renewal deadline by more
    /// than `grace` (§4.4 — the deadline alone is not staleness, a lock
    /// that missed one renewal tick is still within its grace window).
    pub fn is_expired(&self, now_ms: u64, grace: Duration) -> bool {
        now_ms >= self.refresh_deadline_ms + grace.as_millis() as u64
    }

    /// Push the renewal deadline forward by `timeout` from `now_ms`.
    pub fn renew(&mut self, now_ms: u64, timeout: Duration) {
        self.refresh_deadline_ms = now_ms + timeout.as_millis() as u64;
    }
}

/// Outcome of releasing a lock (§4.4 — a lost lease still surfaces via the
/// done channel rather than failing silently).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Released {
    /// Released cleanly by the holder.
    Clean,
    /// Lock expired or was stolen before this holder released it.
    Lost,
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
