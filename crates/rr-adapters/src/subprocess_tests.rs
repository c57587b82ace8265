// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn run_with_timeout_captures_successful_output() {
    let mut cmd = Command::new("echo");
    cmd.arg("hello");
    let output = run_with_timeout(cmd, Duration::from_secs(5), "echo").await.unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
}

#[tokio::test]
async fn run_with_timeout_times_out_long_running_commands() {
    let mut cmd = Command::new("sleep");
    cmd.arg("5");
    let result = run_with_timeout(cmd, Duration::from_millis(50), "sleep").await;
    assert!(matches!(result, Err(SubprocessError::Timeout { .. })));
}

#[tokio::test]
async fn which_returns_none_for_unknown_tool() {
    assert!(which("definitely-not-a-real-tool-xyz").await.is_none());
}
