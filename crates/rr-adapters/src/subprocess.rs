// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helper for running a local subprocess (the incremental-copy tool, or a
//! missing-tool probe) with a hard wall-clock timeout.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

pub const SYNC_COMMAND_TIMEOUT: Duration = Duration::from_secs(3600);
pub const WHICH_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum SubprocessError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn { program: String, #[source] source: std::io::Error },
    #[error("'{program}' timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

/// Run `cmd`, killing it if it runs longer than `timeout`. `label` is used
/// only for error messages.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &str,
) -> Result<Output, SubprocessError> {
    let child = cmd
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| SubprocessError::Spawn { program: label.to_string(), source })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => {
            Err(SubprocessError::Spawn { program: label.to_string(), source })
        }
        Err(_) => Err(SubprocessError::Timeout { program: label.to_string(), timeout }),
    }
}

/// Resolve `tool`'s absolute path on the local machine via `which`, if present.
pub async fn which(tool: &str) -> Option<String> {
    let mut cmd = Command::new("which");
    cmd.arg(tool);
    let output = run_with_timeout(cmd, WHICH_COMMAND_TIMEOUT, "which").await.ok()?;
    if !output.status.success() {
        return None;
    }
    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
