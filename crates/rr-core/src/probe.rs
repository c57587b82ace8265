// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Probe result data model (§3, §4.1).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Classified outcome of a single alias probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeOutcome {
    Ok,
    Timeout,
    Refused,
    Unreachable,
    AuthFailed,
    HostKeyMismatch,
    DnsFailure,
    Unknown,
}

crate::simple_display! {
    ProbeOutcome {
        Ok => "ok",
        Timeout => "timeout",
        Refused => "refused",
        Unreachable => "unreachable",
        AuthFailed => "auth-failed",
        HostKeyMismatch => "host-key-mismatch",
        DnsFailure => "dns-failure",
        Unknown => "unknown",
    }
}

impl ProbeOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ProbeOutcome::Ok)
    }
}

/// Result of probing one alias (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub alias: String,
    pub outcome: ProbeOutcome,
    /// Zero unless `outcome == Ok`.
    pub latency: Duration,
    pub reason: Option<String>,
}

impl ProbeResult {
    pub fn ok(alias: impl Into<String>, latency: Duration) -> Self {
        Self { alias: alias.into(), outcome: ProbeOutcome::Ok, latency, reason: None }
    }

    pub fn failed(alias: impl Into<String>, outcome: ProbeOutcome, reason: impl Into<String>) -> Self {
        debug_assert!(!outcome.is_ok(), "use ProbeResult::ok for successful probes");
        Self { alias: alias.into(), outcome, latency: Duration::ZERO, reason: Some(reason.into()) }
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
