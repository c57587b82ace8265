// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use yare::parameterized;

#[tokio::test]
async fn run_local_captures_stdout_and_exit_code() {
    let (tx, mut rx) = mpsc::channel(16);
    let result = Executor::run(
        &Connection::Local,
        "echo hello && echo world 1>&2",
        &HashMap::new(),
        None,
        tx,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(result.succeeded());
    assert_eq!(result.stdout.trim(), "hello");
    assert_eq!(result.stderr.trim(), "world");

    let mut lines = Vec::new();
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }
    assert_eq!(lines.len(), 2);
}

#[tokio::test]
async fn run_local_nonzero_exit_is_not_an_error_by_itself() {
    let (tx, _rx) = mpsc::channel(16);
    let result =
        Executor::run(&Connection::Local, "exit 7", &HashMap::new(), None, tx, CancellationToken::new())
            .await
            .unwrap();
    assert_eq!(result.exit_code, 7);
}

#[tokio::test]
async fn run_local_missing_tool_is_surfaced_as_missing_tool_error() {
    let (tx, _rx) = mpsc::channel(16);
    let err = Executor::run(
        &Connection::Local,
        "definitely-not-a-real-binary-xyz",
        &HashMap::new(),
        None,
        tx,
        CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind, rr_core::ErrorKind::MissingTool);
}

#[tokio::test]
async fn run_local_honors_cwd() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
    let (tx, _rx) = mpsc::channel(16);
    let result = Executor::run(
        &Connection::Local,
        "ls",
        &HashMap::new(),
        Some(dir.path().to_str().unwrap()),
        tx,
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert!(result.stdout.contains("marker.txt"));
}

#[tokio::test]
async fn run_local_cancellation_stops_the_child_well_before_sigterm_grace() {
    let (tx, _rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = Executor::run(&Connection::Local, "sleep 30", &HashMap::new(), None, tx, cancel).await.unwrap_err();

    assert_eq!(err.exit_code(), rr_core::exit_code::CANCELLED);
    // `sleep` terminates on the first SIGINT, so escalation should never
    // need to reach the SIGTERM grace window.
    assert!(started.elapsed() < SIGINT_GRACE, "cancellation did not stop the child promptly");
}

#[parameterized(
    command_not_found = { "bash: foo: command not found", Some("foo".to_string()) },
    no_such_file = { "/bin/sh: /opt/tool: No such file or directory", Some("tool".to_string()) },
    no_match = { "some other failure", None },
)]
fn extract_tool_name_parses_common_shell_errors(stderr: &str, expected: Option<String>) {
    assert_eq!(extract_tool_name(stderr), expected);
}

#[test]
fn exit_code_from_status_maps_normal_exit() {
    use std::process::Command;
    let status = Command::new("sh").arg("-c").arg("exit 3").status().unwrap();
    assert_eq!(exit_code_from_status(status), 3);
}

#[test]
fn poll_line_reassembles_a_line_split_across_timeouts() {
    // A reader that yields a WouldBlock before the line is complete,
    // matching how a timed-out ssh2 session read surfaces mid-line.
    struct Flaky {
        chunks: std::vec::IntoIter<std::io::Result<&'static [u8]>>,
    }
    impl std::io::Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.chunks.next() {
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(bytes);
                    Ok(bytes.len())
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    let flaky = Flaky {
        chunks: vec![
            Ok(b"hel".as_slice()),
            Err(std::io::Error::new(std::io::ErrorKind::WouldBlock, "timed out")),
            Ok(b"lo\n".as_slice()),
        ]
        .into_iter(),
    };
    let mut reader = std::io::BufReader::new(flaky);
    let mut buf = String::new();

    assert!(matches!(poll_line(&mut reader, &mut buf), LinePoll::Pending));
    match poll_line(&mut reader, &mut buf) {
        LinePoll::Line(line) => assert_eq!(line, "hello"),
        _ => panic!("expected a completed line"),
    }
}
