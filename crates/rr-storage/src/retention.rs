// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retention policy application, run by a separate `clean` operation rather
//! than inline with task execution (§4.8).

use crate::log_store::RunEntry;
use rr_core::RetentionPolicy;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Apply `policy` to `entries` (already sorted newest-first) and return the
/// paths that should be deleted. A directory is deleted if any rule marks it.
pub fn select_for_deletion(entries: &[RunEntry], policy: &RetentionPolicy, now: SystemTime) -> Vec<PathBuf> {
    let mut doomed: Vec<PathBuf> = Vec::new();

    if let Some(keep_runs) = policy.keep_runs {
        doomed.extend(over_keep_runs(entries, keep_runs as usize));
    }
    if let Some(keep_days) = policy.keep_days {
        doomed.extend(older_than(entries, keep_days, now));
    }
    if let Some(max_size_mb) = policy.max_size_mb {
        doomed.extend(over_size_budget(entries, max_size_mb));
    }

    doomed.sort();
    doomed.dedup();
    doomed
}

/// Per task name, keep only the newest `keep_runs` directories.
fn over_keep_runs(entries: &[RunEntry], keep_runs: usize) -> Vec<PathBuf> {
    let mut seen_per_task: HashMap<String, usize> = HashMap::new();
    let mut doomed = Vec::new();
    for entry in entries {
        let key = entry.task.clone().unwrap_or_else(|| "<unknown>".to_string());
        let count = seen_per_task.entry(key).or_insert(0);
        *count += 1;
        if *count > keep_runs {
            doomed.push(entry.path.clone());
        }
    }
    doomed
}

fn older_than(entries: &[RunEntry], keep_days: u32, now: SystemTime) -> Vec<PathBuf> {
    let cutoff = Duration::from_secs(keep_days as u64 * 86_400);
    entries
        .iter()
        .filter(|e| now.duration_since(e.modified_at).map(|age| age > cutoff).unwrap_or(false))
        .map(|e| e.path.clone())
        .collect()
}

/// Delete oldest-first until total size is under `max_size_mb`.
fn over_size_budget(entries: &[RunEntry], max_size_mb: u64) -> Vec<PathBuf> {
    let budget_bytes = max_size_mb * 1024 * 1024;
    let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
    if total <= budget_bytes {
        return Vec::new();
    }

    let mut oldest_first: Vec<&RunEntry> = entries.iter().collect();
    oldest_first.sort_by(|a, b| a.modified_at.cmp(&b.modified_at));

    let mut running_total = total;
    let mut doomed = Vec::new();
    for entry in oldest_first {
        if running_total <= budget_bytes {
            break;
        }
        doomed.push(entry.path.clone());
        running_total = running_total.saturating_sub(entry.size_bytes);
    }
    doomed
}

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;
