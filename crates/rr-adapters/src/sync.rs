// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental copy (push/pull) driven through the external `rsync` binary
//! (§4.3). The engine never implements the transfer protocol itself.

use crate::connection::Connection;
use crate::subprocess::{run_with_timeout, SYNC_COMMAND_TIMEOUT};
use rr_core::{RrError, SyncRules};
use std::path::Path;
use tokio::process::Command;

/// Result of a push or pull.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub would_transfer_bytes: u64,
    pub transferred_bytes: u64,
    pub files_transferred: u64,
}

/// Expand `${PROJECT}`, `${HOME}`, and a leading `~/` in a remote path
/// template (§4.3). `~/...` is left untouched so the remote shell expands it.
pub fn expand_remote_path(template: &str, local_root: &Path) -> String {
    let project = local_root.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    if template.starts_with("~/") || template == "~" {
        return template.to_string();
    }
    template.replace("${PROJECT}", &project).replace("${HOME}", "$HOME")
}

pub struct SyncEngine;

impl SyncEngine {
    /// Push the local tree to the remote root, making it equivalent to the
    /// local one.
    pub async fn push(
        conn: &Connection,
        local_root: &Path,
        remote_root_template: &str,
        rules: &SyncRules,
        dry_run: bool,
    ) -> Result<SyncStats, RrError> {
        let remote = match conn {
            Connection::Local => return Ok(SyncStats::default()),
            Connection::Remote(r) => r.clone(),
        };
        let remote_root = expand_remote_path(remote_root_template, local_root);
        let dest = format!("{}:{}", remote.alias, quote_remote(&remote_root));

        let mut cmd = Command::new("rsync");
        cmd.arg("-az").arg("--delete");
        apply_rules(&mut cmd, rules);
        if dry_run {
            cmd.arg("--dry-run").arg("--stats");
        }
        cmd.arg(format!("{}/", local_root.display()));
        cmd.arg(dest);

        run_rsync(cmd).await
    }

    /// Pull paths matching `remote_patterns` (relative to the remote project
    /// root) back to `local_dest`. Patterns are quoted so expansion happens
    /// on the remote, preserving a literal `~` prefix.
    pub async fn pull(
        conn: &Connection,
        remote_patterns: &[String],
        local_dest: &Path,
        rules: &SyncRules,
    ) -> Result<SyncStats, RrError> {
        let remote = match conn {
            Connection::Local => return Ok(SyncStats::default()),
            Connection::Remote(r) => r.clone(),
        };

        let mut stats = SyncStats::default();
        for pattern in remote_patterns {
            let source = format!("{}:{}", remote.alias, quote_remote(pattern));
            let mut cmd = Command::new("rsync");
            cmd.arg("-az");
            apply_rules(&mut cmd, rules);
            cmd.arg(source);
            cmd.arg(local_dest);
            let step = run_rsync(cmd).await?;
            stats.transferred_bytes += step.transferred_bytes;
            stats.files_transferred += step.files_transferred;
            stats.would_transfer_bytes += step.would_transfer_bytes;
        }
        Ok(stats)
    }
}

fn apply_rules(cmd: &mut Command, rules: &SyncRules) {
    for pattern in &rules.include {
        cmd.arg(format!("--include={pattern}"));
    }
    for pattern in &rules.exclude {
        cmd.arg(format!("--exclude={pattern}"));
    }
}

/// Single-quote `path` for the remote shell, preserving a leading literal
/// `~` (so `~` itself still expands there) while quoting the rest so
/// wildcards survive to be expanded remotely instead of by the local shell.
fn quote_remote(path: &str) -> String {
    match path.strip_prefix('~') {
        Some("") => "~".to_string(),
        Some(rest) => format!("~{}", shell_quote(rest)),
        None => shell_quote(path),
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

async fn run_rsync(cmd: Command) -> Result<SyncStats, RrError> {
    let output = run_with_timeout(cmd, SYNC_COMMAND_TIMEOUT, "rsync")
        .await
        .map_err(|e| RrError::sync(e.to_string(), -1, String::new()))?;

    if !output.status.success() {
        let diagnostic = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(RrError::sync(
            "rsync failed",
            output.status.code().unwrap_or(-1),
            diagnostic,
        ));
    }

    Ok(parse_stats(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_stats(stdout: &str) -> SyncStats {
    let mut stats = SyncStats::default();
    for line in stdout.lines() {
        if let Some(rest) = line.strip_prefix("Total transferred file size:") {
            stats.would_transfer_bytes = parse_bytes(rest);
        } else if let Some(rest) = line.strip_prefix("Total bytes sent:") {
            stats.transferred_bytes = parse_bytes(rest);
        } else if let Some(rest) = line.strip_prefix("Number of regular files transferred:") {
            stats.files_transferred = rest.trim().replace(',', "").parse().unwrap_or(0);
        }
    }
    stats
}

fn parse_bytes(field: &str) -> u64 {
    field
        .trim()
        .trim_end_matches(" bytes")
        .replace(',', "")
        .parse()
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
