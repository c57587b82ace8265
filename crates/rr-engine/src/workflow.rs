// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-shot orchestration used by direct `run`/`exec`/`sync`/`pull`
//! operations and by each task step (§4.6).

use crate::executor::{CommandResult, Executor, OutputLine};
use indexmap::IndexMap;
use rr_adapters::{Connection, LockHandle, LockPolicy, Locker, SelectPreferences, Selector, SyncEngine, SyncStats};
use rr_core::{exit_code, HostEntry, OnFail, ProjectFingerprint, RrError, Step, SyncRules};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Caller-supplied knobs for one Workflow invocation.
pub struct WorkflowOptions {
    pub host: Option<String>,
    pub tag: Option<String>,
    pub probe_timeout: Duration,
    pub skip_sync: bool,
    pub skip_lock: bool,
    /// Whether the project configuration has locking enabled at all.
    pub lock_enabled: bool,
    pub dry_run: bool,
    pub pull_patterns: Vec<String>,
    pub pull_dest: Option<std::path::PathBuf>,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            host: None,
            tag: None,
            probe_timeout: Duration::from_secs(5),
            skip_sync: false,
            skip_lock: false,
            lock_enabled: true,
            dry_run: false,
            pull_patterns: Vec::new(),
            pull_dest: None,
        }
    }
}

/// Outcome of one optional phase: either it ran and produced `T`, or it was
/// deliberately skipped with a reason (§4.6).
#[derive(Debug, Clone)]
pub enum PhaseOutcome<T> {
    Ran(T),
    Skipped(&'static str),
}

impl<T> PhaseOutcome<T> {
    pub fn ran(&self) -> bool {
        matches!(self, PhaseOutcome::Ran(_))
    }
}

/// The full result of a single-command Workflow invocation. `error` is set
/// when a pre-execute phase failed; `command_result` is set iff Execute ran.
pub struct WorkflowReport {
    pub host: String,
    pub push: PhaseOutcome<SyncStats>,
    pub lock: PhaseOutcome<()>,
    pub command_result: Option<CommandResult>,
    pub pull: PhaseOutcome<SyncStats>,
    pub warnings: Vec<String>,
    pub error: Option<RrError>,
}

impl WorkflowReport {
    fn new(host: String) -> Self {
        Self {
            host,
            push: PhaseOutcome::Skipped("not reached"),
            lock: PhaseOutcome::Skipped("not reached"),
            command_result: None,
            pull: PhaseOutcome::Skipped("not reached"),
            warnings: Vec::new(),
            error: None,
        }
    }

    /// Exit code for this invocation (§4.6): the Execute exit code if it
    /// ran, else the error's mapped code, else success.
    pub fn exit_code(&self) -> i32 {
        if let Some(result) = &self.command_result {
            return result.exit_code;
        }
        if let Some(error) = &self.error {
            return error.exit_code();
        }
        exit_code::SUCCESS
    }
}

/// Result of one step within a `run_steps` sequence.
pub struct StepOutcome {
    pub step: Step,
    pub result: CommandResult,
}

/// The result of running an ordered step list under one shared selection
/// and lock (§4.7 "a step list → sequential Workflow calls sharing one
/// selected host and lock").
pub struct StepsReport {
    pub host: String,
    pub push: PhaseOutcome<SyncStats>,
    pub lock: PhaseOutcome<()>,
    pub steps: Vec<StepOutcome>,
    pub pull: PhaseOutcome<SyncStats>,
    pub warnings: Vec<String>,
    pub error: Option<RrError>,
    /// Ordinal of the first failed step, or `None` if every step ran and
    /// either succeeded or was skipped by a prior `continue` policy.
    pub failed_step: Option<usize>,
}

impl StepsReport {
    fn new(host: String) -> Self {
        Self {
            host,
            push: PhaseOutcome::Skipped("not reached"),
            lock: PhaseOutcome::Skipped("not reached"),
            steps: Vec::new(),
            pull: PhaseOutcome::Skipped("not reached"),
            warnings: Vec::new(),
            error: None,
            failed_step: None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        if let Some(ordinal) = self.failed_step {
            return self.steps[ordinal].result.exit_code;
        }
        if let Some(error) = &self.error {
            return error.exit_code();
        }
        exit_code::SUCCESS
    }
}

pub struct Workflow;

impl Workflow {
    /// Run the full seven-phase pipeline for a single command. `now_ms`
    /// drives lock token timestamps so callers can substitute a fake clock
    /// in tests.
    #[allow(clippy::too_many_arguments)]
    pub async fn run(
        selector: &Selector,
        hosts: &IndexMap<String, HostEntry>,
        fingerprint: &ProjectFingerprint,
        holder: &str,
        local_root: &Path,
        sync_rules: &SyncRules,
        lock_policy: LockPolicy,
        now_ms: u64,
        command: &str,
        env: &HashMap<String, String>,
        cwd: Option<&str>,
        opts: &WorkflowOptions,
        sink: mpsc::Sender<OutputLine>,
        cancel: CancellationToken,
    ) -> Result<WorkflowReport, RrError> {
        let (host_name, conn) = select(selector, hosts, opts).await?;
        let mut report = WorkflowReport::new(host_name.clone());
        let mut lock_handle: Option<LockHandle> = None;

        let outcome: Result<(), RrError> = async {
            push_phase(&conn, local_root, sync_rules, opts, &mut report.push).await?;
            lock_phase(&conn, fingerprint, holder, lock_policy, now_ms, opts, &mut report.lock, &mut lock_handle)
                .await?;

            tracing::info!(host = %host_name, "executing command");
            let result = Executor::run(&conn, command, env, cwd, sink, cancel).await?;
            report.command_result = Some(result);

            pull_phase(&conn, local_root, sync_rules, opts, &mut report.pull, &mut report.warnings).await;
            Ok(())
        }
        .await;

        release(&conn, lock_handle, &host_name).await;
        if let Err(error) = outcome {
            report.error = Some(error);
        }
        Ok(report)
    }

    /// Run an ordered step list under one shared selection and lock (§4.7).
    /// Consults each step's `on_fail` policy between steps.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_steps(
        selector: &Selector,
        hosts: &IndexMap<String, HostEntry>,
        fingerprint: &ProjectFingerprint,
        holder: &str,
        local_root: &Path,
        sync_rules: &SyncRules,
        lock_policy: LockPolicy,
        now_ms: u64,
        steps: &[Step],
        env: &HashMap<String, String>,
        cwd: Option<&str>,
        opts: &WorkflowOptions,
        mut sink_for_step: impl FnMut(usize, &str) -> mpsc::Sender<OutputLine>,
        cancel: CancellationToken,
    ) -> Result<StepsReport, RrError> {
        let (host_name, conn) = select(selector, hosts, opts).await?;
        let mut report = StepsReport::new(host_name.clone());
        let mut lock_handle: Option<LockHandle> = None;

        let outcome: Result<(), RrError> = async {
            push_phase(&conn, local_root, sync_rules, opts, &mut report.push).await?;
            lock_phase(&conn, fingerprint, holder, lock_policy, now_ms, opts, &mut report.lock, &mut lock_handle)
                .await?;

            for (ordinal, step) in steps.iter().enumerate() {
                if cancel.is_cancelled() {
                    break;
                }
                tracing::info!(host = %host_name, step = %step.name, "executing step");
                let sink = sink_for_step(ordinal, &step.name);
                let result = Executor::run(&conn, &step.command, env, cwd, sink, cancel.clone()).await?;
                let failed = result.exit_code != 0;
                report.steps.push(StepOutcome { step: step.clone(), result });
                if failed {
                    report.failed_step.get_or_insert(ordinal);
                    if step.on_fail == OnFail::Abort {
                        break;
                    }
                }
            }

            pull_phase(&conn, local_root, sync_rules, opts, &mut report.pull, &mut report.warnings).await;
            Ok(())
        }
        .await;

        release(&conn, lock_handle, &host_name).await;
        if let Err(error) = outcome {
            report.error = Some(error);
        }
        Ok(report)
    }
}

async fn select(
    selector: &Selector,
    hosts: &IndexMap<String, HostEntry>,
    opts: &WorkflowOptions,
) -> Result<(String, Connection), RrError> {
    let prefs = SelectPreferences {
        host: opts.host.clone(),
        tag: opts.tag.clone(),
        probe_timeout: opts.probe_timeout,
        local_fallback: false,
        picker: None,
    };
    selector.select(hosts, &prefs).await
}

async fn push_phase(
    conn: &Connection,
    local_root: &Path,
    sync_rules: &SyncRules,
    opts: &WorkflowOptions,
    outcome: &mut PhaseOutcome<SyncStats>,
) -> Result<(), RrError> {
    if conn.is_local() || opts.skip_sync {
        *outcome = PhaseOutcome::Skipped(if conn.is_local() { "local connection" } else { "skip_sync" });
        return Ok(());
    }
    tracing::debug!(host = %conn.host_label(), "pushing project tree");
    let stats = SyncEngine::push(conn, local_root, conn.remote_dir().unwrap_or(""), sync_rules, opts.dry_run).await?;
    *outcome = PhaseOutcome::Ran(stats);
    Ok(())
}

async fn lock_phase(
    conn: &Connection,
    fingerprint: &ProjectFingerprint,
    holder: &str,
    lock_policy: LockPolicy,
    now_ms: u64,
    opts: &WorkflowOptions,
    outcome: &mut PhaseOutcome<()>,
    lock_handle: &mut Option<LockHandle>,
) -> Result<(), RrError> {
    if conn.is_local() || opts.skip_lock || !opts.lock_enabled {
        *outcome = PhaseOutcome::Skipped(if conn.is_local() {
            "local connection"
        } else if !opts.lock_enabled {
            "locking disabled"
        } else {
            "skip_lock"
        });
        return Ok(());
    }
    tracing::debug!(host = %conn.host_label(), "acquiring lock");
    let handle = Locker::acquire(conn, fingerprint, holder, lock_policy, now_ms).await?;
    *lock_handle = Some(handle);
    *outcome = PhaseOutcome::Ran(());
    Ok(())
}

async fn pull_phase(
    conn: &Connection,
    local_root: &Path,
    sync_rules: &SyncRules,
    opts: &WorkflowOptions,
    outcome: &mut PhaseOutcome<SyncStats>,
    warnings: &mut Vec<String>,
) {
    if opts.pull_patterns.is_empty() || conn.is_local() {
        *outcome = PhaseOutcome::Skipped(if conn.is_local() { "local connection" } else { "no pull patterns" });
        return;
    }
    let dest = opts.pull_dest.as_deref().unwrap_or(local_root);
    tracing::debug!(host = %conn.host_label(), "pulling artifacts");
    match SyncEngine::pull(conn, &opts.pull_patterns, dest, sync_rules).await {
        Ok(stats) => *outcome = PhaseOutcome::Ran(stats),
        Err(e) => {
            tracing::warn!(host = %conn.host_label(), error = %e, "pull failed; execute result preserved");
            warnings.push(format!("pull failed: {e}"));
        }
    }
}

async fn release(conn: &Connection, lock_handle: Option<LockHandle>, host_name: &str) {
    if let Some(handle) = lock_handle {
        let released = Locker::release(conn, handle).await;
        tracing::info!(host = %host_name, released = ?released, "lock released");
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
