// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streams a command on a connection and demultiplexes its output (§4.5).

use rr_adapters::{subprocess, Connection};
use rr_core::RrError;
use std::collections::HashMap;
use std::io::BufRead;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const SIGINT_GRACE: Duration = Duration::from_secs(5);

/// Result of a single command invocation (§3, §4.5).
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// A line emitted on stdout or stderr, preserving which stream it came from.
#[derive(Debug, Clone)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

const MISSING_TOOL_PATTERNS: &[&str] =
    &["command not found", "No such file or directory", "is not recognized"];

pub struct Executor;

impl Executor {
    /// Run `command` on `conn`, streaming output lines to `sink` as they
    /// arrive and returning the aggregate result once the process exits.
    pub async fn run(
        conn: &Connection,
        command: &str,
        env: &HashMap<String, String>,
        cwd: Option<&str>,
        sink: mpsc::Sender<OutputLine>,
        cancel: CancellationToken,
    ) -> Result<CommandResult, RrError> {
        let started = Instant::now();
        let result = match conn {
            Connection::Local => run_local(command, env, cwd, sink, cancel).await,
            Connection::Remote(remote) => run_remote(remote.clone(), command, env, cwd, sink, cancel).await,
        };

        let mut result = result?;
        result.duration = started.elapsed();

        if result.exit_code != 0 {
            if let Some(err) = detect_missing_tool(conn, &result.stderr, conn.host_label()).await {
                return Err(err);
            }
        }
        Ok(result)
    }
}

async fn run_local(
    command: &str,
    env: &HashMap<String, String>,
    cwd: Option<&str>,
    sink: mpsc::Sender<OutputLine>,
    cancel: CancellationToken,
) -> Result<CommandResult, RrError> {
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::process::Command;

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command).envs(env).stdout(std::process::Stdio::piped()).stderr(std::process::Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|e| RrError::exec(format!("failed to spawn local shell: {e}")))?;
    let stdout = child.stdout.take().expect("piped stdout");
    let stderr = child.stderr.take().expect("piped stderr");

    let mut out_lines = BufReader::new(stdout).lines();
    let mut err_lines = BufReader::new(stderr).lines();
    let mut captured_out = String::new();
    let mut captured_err = String::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                escalate_local(&mut child).await;
                return Err(RrError::exit_with(rr_core::exit_code::CANCELLED));
            }
            line = out_lines.next_line() => match line {
                Ok(Some(line)) => {
                    captured_out.push_str(&line);
                    captured_out.push('\n');
                    let _ = sink.send(OutputLine::Stdout(line)).await;
                }
                Ok(None) => break,
                Err(_) => break,
            },
            line = err_lines.next_line() => match line {
                Ok(Some(line)) => {
                    captured_err.push_str(&line);
                    captured_err.push('\n');
                    let _ = sink.send(OutputLine::Stderr(line)).await;
                }
                Ok(None) => {}
                Err(_) => {}
            },
        }
    }

    let status = child.wait().await.map_err(|e| RrError::exec(format!("failed to wait on local shell: {e}")))?;
    let exit_code = exit_code_from_status(status);
    Ok(CommandResult { exit_code, stdout: captured_out, stderr: captured_err, duration: Duration::ZERO })
}

/// Escalate a local cancellation: SIGINT, then SIGTERM after `SIGINT_GRACE`
/// if the child hasn't exited, then SIGKILL as a last resort (§4.5, §5).
#[cfg(unix)]
async fn escalate_local(child: &mut tokio::process::Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(raw_pid) = child.id() else { return };
    let pid = Pid::from_raw(raw_pid as i32);

    let _ = kill(pid, Signal::SIGINT);
    if tokio::time::timeout(SIGINT_GRACE, child.wait()).await.is_ok() {
        return;
    }
    let _ = kill(pid, Signal::SIGTERM);
    if tokio::time::timeout(SIGINT_GRACE, child.wait()).await.is_ok() {
        return;
    }
    let _ = child.start_kill();
    let _ = child.wait().await;
}

#[cfg(not(unix))]
async fn escalate_local(child: &mut tokio::process::Child) {
    let _ = child.start_kill();
    let _ = child.wait().await;
}

fn exit_code_from_status(status: std::process::ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => {
            #[cfg(unix)]
            {
                use std::os::unix::process::ExitStatusExt;
                status.signal().map(|sig| 128 + sig).unwrap_or(255)
            }
            #[cfg(not(unix))]
            {
                255
            }
        }
    }
}

/// A signal to deliver to the tracked remote process, sent over a side
/// channel from the async cancellation arm to the blocking session worker.
enum RemoteSignal {
    Sigint,
    Sigterm,
}

async fn run_remote(
    remote: std::sync::Arc<rr_adapters::RemoteSession>,
    command: &str,
    env: &HashMap<String, String>,
    cwd: Option<&str>,
    sink: mpsc::Sender<OutputLine>,
    cancel: CancellationToken,
) -> Result<CommandResult, RrError> {
    let script = build_remote_script(command, env, cwd);
    let (line_tx, mut line_rx) = mpsc::unbounded_channel();
    let (signal_tx, signal_rx) = std::sync::mpsc::channel::<RemoteSignal>();

    let blocking = tokio::task::spawn_blocking(move || run_remote_blocking(&remote, &script, line_tx, signal_rx));

    let mut captured_out = String::new();
    let mut captured_err = String::new();
    let mut escalating = false;
    loop {
        tokio::select! {
            _ = cancel.cancelled(), if !escalating => {
                escalating = true;
                let _ = signal_tx.send(RemoteSignal::Sigint);
                let tx = signal_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(SIGINT_GRACE).await;
                    let _ = tx.send(RemoteSignal::Sigterm);
                });
            }
            line = line_rx.recv() => match line {
                Some(OutputLine::Stdout(l)) => {
                    captured_out.push_str(&l);
                    captured_out.push('\n');
                    let _ = sink.send(OutputLine::Stdout(l)).await;
                }
                Some(OutputLine::Stderr(l)) => {
                    captured_err.push_str(&l);
                    captured_err.push('\n');
                    let _ = sink.send(OutputLine::Stderr(l)).await;
                }
                None => break,
            }
        }
    }

    let exit_code = blocking
        .await
        .map_err(|e| RrError::exec(format!("executor task panicked: {e}")))?
        .map_err(|e| RrError::exec(format!("{e} (transport loss)")).with_details(serde_json::json!({ "exit_code": rr_core::exit_code::TRANSPORT_LOSS })))?;

    if escalating {
        return Err(RrError::exit_with(rr_core::exit_code::CANCELLED));
    }

    Ok(CommandResult { exit_code, stdout: captured_out, stderr: captured_err, duration: Duration::ZERO })
}

fn build_remote_script(command: &str, env: &HashMap<String, String>, cwd: Option<&str>) -> String {
    let mut script = String::new();
    if let Some(dir) = cwd {
        script.push_str(&format!("cd {} && ", shell_quote(dir)));
    }
    for (key, value) in env {
        script.push_str(&format!("export {key}={} && ", shell_quote(value)));
    }
    script.push_str(command);
    script
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// How long a single read poll blocks before giving the read loop a chance
/// to check for a pending signal request.
const POLL_TIMEOUT_MS: u32 = 200;

const REMOTE_PID_MARKER: &str = "__rr_remote_pid__:";

fn run_remote_blocking(
    remote: &rr_adapters::RemoteSession,
    script: &str,
    line_tx: mpsc::UnboundedSender<OutputLine>,
    signal_rx: std::sync::mpsc::Receiver<RemoteSignal>,
) -> Result<i32, String> {
    let mut session = remote.session.lock();
    session.set_timeout(POLL_TIMEOUT_MS);

    // `exec`'d into so the tracked pid is the command's own pid, not a
    // short-lived wrapper shell's, letting a later `kill` target it directly.
    let wrapped = format!("echo {REMOTE_PID_MARKER}$$ 1>&2; exec sh -c {}", shell_quote(script));
    let mut channel = session.channel_session().map_err(|e| e.to_string())?;
    channel.exec(&wrapped).map_err(|e| e.to_string())?;

    let mut stdout_reader = std::io::BufReader::new(channel.stream(0));
    let mut stderr_reader = std::io::BufReader::new(channel.stderr());
    let mut out_buf = String::new();
    let mut err_buf = String::new();
    let mut out_done = false;
    let mut err_done = false;
    let mut remote_pid: Option<u32> = None;

    while !out_done || !err_done {
        if !out_done {
            match poll_line(&mut stdout_reader, &mut out_buf) {
                LinePoll::Line(line) => {
                    let _ = line_tx.send(OutputLine::Stdout(line));
                }
                LinePoll::Eof | LinePoll::Err => out_done = true,
                LinePoll::Pending => {}
            }
        }
        if !err_done {
            match poll_line(&mut stderr_reader, &mut err_buf) {
                LinePoll::Line(line) => {
                    if remote_pid.is_none() {
                        if let Some(pid) = line.strip_prefix(REMOTE_PID_MARKER).and_then(|s| s.parse().ok()) {
                            remote_pid = Some(pid);
                        } else {
                            let _ = line_tx.send(OutputLine::Stderr(line));
                        }
                    } else {
                        let _ = line_tx.send(OutputLine::Stderr(line));
                    }
                }
                LinePoll::Eof | LinePoll::Err => err_done = true,
                LinePoll::Pending => {}
            }
        }

        if let Ok(signal) = signal_rx.try_recv() {
            if let Some(pid) = remote_pid {
                let _ = send_remote_signal(&session, pid, signal);
            }
        }
    }

    session.set_timeout(0);
    channel.wait_close().map_err(|e| e.to_string())?;
    channel.exit_status().map_err(|e| e.to_string())
}

enum LinePoll {
    Line(String),
    Eof,
    Pending,
    Err,
}

/// Read one line without blocking indefinitely: the session's short timeout
/// (`POLL_TIMEOUT_MS`) surfaces as a `WouldBlock`/`TimedOut` I/O error, which
/// just means "nothing ready yet" rather than end of stream.
fn poll_line(reader: &mut impl std::io::BufRead, buf: &mut String) -> LinePoll {
    match reader.read_line(buf) {
        Ok(0) => LinePoll::Eof,
        Ok(_) => {
            let line = buf.trim_end_matches('\n').to_string();
            buf.clear();
            LinePoll::Line(line)
        }
        Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
            LinePoll::Pending
        }
        Err(_) => LinePoll::Err,
    }
}

/// Send `signal` to `pid` over a short-lived auxiliary channel on the same
/// session (already held by this thread, so no extra locking is needed).
fn send_remote_signal(session: &ssh2::Session, pid: u32, signal: RemoteSignal) -> Result<(), String> {
    let flag = match signal {
        RemoteSignal::Sigint => "-INT",
        RemoteSignal::Sigterm => "-TERM",
    };
    let mut channel = session.channel_session().map_err(|e| e.to_string())?;
    channel.exec(&format!("kill {flag} {pid} 2>/dev/null")).map_err(|e| e.to_string())?;
    let _ = channel.wait_close();
    Ok(())
}

async fn detect_missing_tool(conn: &Connection, stderr: &str, host: &str) -> Option<RrError> {
    let matched = MISSING_TOOL_PATTERNS.iter().any(|pattern| stderr.contains(pattern));
    if !matched {
        return None;
    }
    let tool = extract_tool_name(stderr)?;
    let found_at_path = probe_alternative_paths(conn, &tool).await;
    Some(RrError::missing_tool(tool, host, found_at_path))
}

fn extract_tool_name(stderr: &str) -> Option<String> {
    for line in stderr.lines() {
        if let Some(idx) = line.find(": command not found") {
            let prefix = &line[..idx];
            return prefix.rsplit(' ').next().map(|s| s.trim().to_string());
        }
        if let Some(idx) = line.find(": No such file or directory") {
            let prefix = &line[..idx];
            return prefix.rsplit('/').next().map(|s| s.trim().to_string());
        }
    }
    None
}

async fn probe_alternative_paths(conn: &Connection, tool: &str) -> Option<String> {
    match conn {
        Connection::Local => subprocess::which(tool).await,
        Connection::Remote(_) => None, // requires an extra round trip; left for the CLI's `doctor` surface
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
