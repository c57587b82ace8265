// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative, project-scoped mutual exclusion on a remote host (§4.4).

use crate::connection::{Connection, RemoteSession};
use rr_core::{LockToken, ProjectFingerprint, Released, RrError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Policy governing acquisition timeout, renewal grace, and backoff.
#[derive(Debug, Clone, Copy)]
pub struct LockPolicy {
    pub timeout: Duration,
    pub grace: Duration,
}

/// A held lock plus the background renewer keeping it alive. Dropping this
/// without calling [`Locker::release`] leaves the renewer running; callers
/// must release explicitly (Workflow's guaranteed-release phase, §4.6).
pub struct LockHandle {
    pub token: LockToken,
    cancel: CancellationToken,
    renewer: tokio::task::JoinHandle<()>,
    pub done: mpsc::Receiver<Released>,
}

impl LockHandle {
    /// Stop the renewer without touching the remote lock file.
    pub fn stop_renewer(&self) {
        self.cancel.cancel();
    }
}

pub struct Locker;

const BACKOFF_FLOOR: Duration = Duration::from_secs(1);
const BACKOFF_CEILING: Duration = Duration::from_secs(10);
const MAX_RENEW_FAILURES: u32 = 3;

impl Locker {
    /// Acquire (or re-entrantly refresh) a lock on `conn` for `fingerprint`.
    pub async fn acquire(
        conn: &Connection,
        fingerprint: &ProjectFingerprint,
        holder: &str,
        policy: LockPolicy,
        now_ms: u64,
    ) -> Result<LockHandle, RrError> {
        let remote = match conn {
            Connection::Local => {
                return Err(RrError::lock("cannot acquire a lock on the local pseudo-host"))
            }
            Connection::Remote(r) => r.clone(),
        };

        let remote_path = lock_path(&remote.dir, fingerprint);
        let deadline = tokio::time::Instant::now() + policy.timeout;
        let mut backoff = BACKOFF_FLOOR;
        let mut retried_stale = false;

        loop {
            tracing::debug!(host = %remote.host, fingerprint = %fingerprint, "attempting lock acquisition");
            let contents = lock_file_contents(fingerprint, &remote.host, holder, now_ms, policy.timeout);
            match remote_create_if_absent(&remote, &remote_path, &contents).await {
                Ok(true) => {
                    tracing::info!(host = %remote.host, fingerprint = %fingerprint, "lock acquired");
                    return Ok(spawn_renewer(
                        remote,
                        remote_path,
                        LockToken::new(fingerprint.clone(), conn.host_label(), holder, now_ms, policy.timeout, String::new()),
                        policy,
                    ));
                }
                Ok(false) => {
                    let existing = remote_read(&remote, &remote_path).await?;
                    let parsed = parse_lock_file(&existing);
                    if parsed.as_ref().map(|p| p.holder == holder).unwrap_or(false) {
                        tracing::debug!(host = %remote.host, "re-entrant lock refresh");
                        remote_write(&remote, &remote_path, &contents).await?;
                        return Ok(spawn_renewer(
                            remote,
                            remote_path,
                            LockToken::new(fingerprint.clone(), conn.host_label(), holder, now_ms, policy.timeout, String::new()),
                            policy,
                        ));
                    }

                    let stale = parsed.as_ref().map(|p| p.is_expired(now_ms, policy.grace)).unwrap_or(true);
                    if stale && !retried_stale {
                        tracing::warn!(host = %remote.host, fingerprint = %fingerprint, "stale lock detected, forcing release");
                        remote_remove(&remote, &remote_path).await?;
                        retried_stale = true;
                        continue;
                    }

                    if tokio::time::Instant::now() >= deadline {
                        return Err(RrError::lock(format!(
                            "timed out waiting for lock on {}",
                            remote.host
                        )));
                    }
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(BACKOFF_CEILING);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Idempotent release; best-effort if the connection has died.
    pub async fn release(conn: &Connection, mut handle: LockHandle) -> Released {
        handle.stop_renewer();
        let remote = match conn {
            Connection::Local => return Released::Clean,
            Connection::Remote(r) => r.clone(),
        };
        let path = lock_path(&remote.dir, &handle.token.project_fingerprint);
        match remote_remove(&remote, &path).await {
            Ok(_) => Released::Clean,
            Err(e) => {
                tracing::warn!(host = %remote.host, error = %e, "lock release failed; connection may be gone");
                Released::Lost
            }
        }
    }

    pub async fn force_release(conn: &Connection, fingerprint: &ProjectFingerprint) -> Result<(), RrError> {
        let remote = match conn {
            Connection::Local => return Ok(()),
            Connection::Remote(r) => r.clone(),
        };
        let path = lock_path(&remote.dir, fingerprint);
        remote_remove(&remote, &path).await
    }
}

fn spawn_renewer(
    remote: Arc<RemoteSession>,
    remote_path: String,
    token: LockToken,
    policy: LockPolicy,
) -> LockHandle {
    let cancel = CancellationToken::new();
    let (done_tx, done_rx) = mpsc::channel(1);
    let interval = policy.timeout / 3;
    let renewer_cancel = cancel.clone();
    let renewer_token = token.clone();
    let base_ms = token.acquired_at_ms;
    let clock_start = std::time::Instant::now();

    let renewer = tokio::spawn(async move {
        let failures = AtomicU32::new(0);
        loop {
            tokio::select! {
                _ = renewer_cancel.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }
            let now_ms = base_ms + clock_start.elapsed().as_millis() as u64;
            let contents = lock_file_contents(
                &renewer_token.project_fingerprint,
                &renewer_token.host,
                &renewer_token.holder,
                now_ms,
                policy.timeout,
            );
            match remote_write(&remote, &remote_path, &contents).await {
                Ok(()) => {
                    failures.store(0, Ordering::Relaxed);
                }
                Err(e) => {
                    let count = failures.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::warn!(host = %remote.host, error = %e, attempt = count, "lock renewal failed");
                    if count >= MAX_RENEW_FAILURES {
                        let _ = done_tx.send(Released::Lost).await;
                        return;
                    }
                }
            }
        }
    });

    LockHandle { token, cancel, renewer, done: done_rx }
}

fn lock_path(remote_dir: &str, fingerprint: &ProjectFingerprint) -> String {
    let digest = fingerprint.as_str().bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    format!("{remote_dir}/.rr/lock-{digest:016x}")
}

fn lock_file_contents(
    fingerprint: &ProjectFingerprint,
    origin_host: &str,
    holder: &str,
    now_ms: u64,
    timeout: Duration,
) -> String {
    format!(
        "holder: {holder}\norigin: {origin_host}\nfingerprint: {fingerprint}\nacquired_at_ms: {now_ms}\nrefresh_deadline_ms: {deadline}\n",
        deadline = now_ms + timeout.as_millis() as u64,
    )
}

struct ParsedLock {
    holder: String,
    refresh_deadline_ms: u64,
}

impl ParsedLock {
    /// Stale once `now_ms` passes the written deadline by more than `grace`
    /// (§4.4): a lock that simply missed its exact renewal tick is not yet
    /// abandoned.
    fn is_expired(&self, now_ms: u64, grace: Duration) -> bool {
        now_ms >= self.refresh_deadline_ms + grace.as_millis() as u64
    }
}

fn parse_lock_file(contents: &str) -> Option<ParsedLock> {
    let mut holder = None;
    let mut deadline = None;
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("holder: ") {
            holder = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("refresh_deadline_ms: ") {
            deadline = rest.trim().parse().ok();
        }
    }
    Some(ParsedLock { holder: holder?, refresh_deadline_ms: deadline? })
}

async fn remote_create_if_absent(remote: &Arc<RemoteSession>, path: &str, contents: &str) -> Result<bool, RrError> {
    let script = format!(
        "mkdir -p \"$(dirname '{path}')\" && (set -C; printf '%s' {content} > '{path}') 2>/dev/null && echo CREATED || echo EXISTS",
        content = shell_quote(contents),
    );
    let (exit, stdout, _stderr) = exec(remote, &script).await?;
    Ok(exit == 0 && stdout.trim() == "CREATED")
}

async fn remote_write(remote: &Arc<RemoteSession>, path: &str, contents: &str) -> Result<(), RrError> {
    let script = format!("printf '%s' {content} > '{path}'", content = shell_quote(contents));
    let (exit, _stdout, stderr) = exec(remote, &script).await?;
    if exit != 0 {
        return Err(RrError::lock(format!("failed to write lock file: {}", stderr.trim())));
    }
    Ok(())
}

async fn remote_read(remote: &Arc<RemoteSession>, path: &str) -> Result<String, RrError> {
    let script = format!("cat '{path}' 2>/dev/null");
    let (_exit, stdout, _stderr) = exec(remote, &script).await?;
    Ok(stdout)
}

async fn remote_remove(remote: &Arc<RemoteSession>, path: &str) -> Result<(), RrError> {
    let script = format!("rm -f '{path}'");
    let (exit, _stdout, stderr) = exec(remote, &script).await?;
    if exit != 0 {
        return Err(RrError::lock(format!("failed to remove lock file: {}", stderr.trim())));
    }
    Ok(())
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Run a shell command on the remote session and collect its exit code and
/// output, blocking the calling thread — driven via `spawn_blocking`.
async fn exec(remote: &Arc<RemoteSession>, script: &str) -> Result<(i32, String, String), RrError> {
    let remote = remote.clone();
    let script = script.to_string();
    tokio::task::spawn_blocking(move || exec_blocking(&remote, &script))
        .await
        .map_err(|e| RrError::lock(format!("lock exec task panicked: {e}")))?
}

fn exec_blocking(remote: &RemoteSession, script: &str) -> Result<(i32, String, String), RrError> {
    let session = remote.session.lock();
    let mut channel = session
        .channel_session()
        .map_err(|e| RrError::lock(format!("failed to open channel: {e}")))?;
    channel.exec(script).map_err(|e| RrError::lock(format!("exec failed: {e}")))?;

    use std::io::Read;
    let mut stdout = String::new();
    let mut stderr = String::new();
    channel.read_to_string(&mut stdout).ok();
    channel.stderr().read_to_string(&mut stderr).ok();
    channel.wait_close().ok();
    let exit = channel.exit_status().unwrap_or(-1);
    Ok((exit, stdout, stderr))
}

#[cfg(test)]
#[path = "locker_tests.rs"]
mod tests;
