// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns a declared task into one or more Workflow invocations: DAG walk,
//! step-list/parallel dispatch, and `--repeat` flake-detection fan-out (§4.7).

use crate::dag::{self, PlanNode};
use crate::executor::OutputLine;
use crate::workflow::{Workflow, WorkflowOptions};
use chrono::Utc;
use indexmap::IndexMap;
use rr_adapters::{LockPolicy, Selector};
use rr_core::{HostEntry, ProjectFingerprint, RrError, StepResult, SyncRules, TaskBody, TaskResult, TaskSpec};
use rr_storage::{HostAssignment, LogStore, RunDirectory};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

/// Shared, read-only dependencies for a task run. Every field is cheaply
/// cloneable so fan-out can hand each spawned sibling its own owned copy,
/// the same way `rr_adapters::probe::probe_all` clones aliases before
/// spawning rather than borrowing across the task boundary.
#[derive(Clone)]
pub struct TaskEngineContext {
    pub selector: Arc<Selector>,
    pub hosts: Arc<IndexMap<String, HostEntry>>,
    pub tasks: Arc<IndexMap<String, TaskSpec>>,
    pub holder: Arc<str>,
    pub local_root: Arc<PathBuf>,
    pub sync_rules: Arc<SyncRules>,
    pub lock_policy: LockPolicy,
    pub log_store: Arc<LogStore>,
    pub env: Arc<HashMap<String, String>>,
    pub now_ms: u64,
    pub probe_timeout: Duration,
    pub lock_enabled: bool,
}

impl TaskEngineContext {
    fn workflow_opts(&self) -> WorkflowOptions {
        WorkflowOptions {
            probe_timeout: self.probe_timeout,
            lock_enabled: self.lock_enabled,
            ..WorkflowOptions::default()
        }
    }
}

/// Result of one `run_task` invocation.
pub struct TaskOutcome {
    pub result: TaskResult,
    pub run_dir: RunDirectory,
}

/// Aggregate result of a `--repeat N` fan-out (§4.7).
pub struct RepeatReport {
    pub total: usize,
    pub successes: usize,
    pub first_failure_ordinal: Option<usize>,
    pub elapsed: Duration,
    pub assignments: Vec<HostAssignment>,
}

impl RepeatReport {
    pub fn exit_code(&self) -> i32 {
        if self.successes == self.total {
            rr_core::exit_code::SUCCESS
        } else {
            rr_core::exit_code::GENERIC_FAILURE
        }
    }
}

pub struct TaskEngine;

impl TaskEngine {
    /// Resolve `root`'s DAG and walk the resulting plan, writing a log
    /// directory with one entry per step and a summary/manifest.
    pub async fn run_task(
        root: &str,
        ctx: &TaskEngineContext,
        fingerprint: &ProjectFingerprint,
        cancel: CancellationToken,
    ) -> Result<TaskOutcome, RrError> {
        let plan = dag::resolve(root, &ctx.tasks)?;
        let started_at = Utc::now();
        let run_dir = ctx
            .log_store
            .create_run(root, started_at)
            .await
            .map_err(|e| RrError::exec(format!("failed to create run directory: {e}")))?;

        let mut steps: Vec<StepResult> = Vec::new();
        let mut assignments: Vec<HostAssignment> = Vec::new();
        let mut ordinal = 0usize;

        for node in &plan {
            if cancel.is_cancelled() {
                break;
            }
            let names: Vec<String> = match node {
                PlanNode::Task(name) => vec![name.clone()],
                PlanNode::Group(names) => names.clone(),
            };

            let (mut node_assignments, node_steps) = if names.len() == 1 {
                let (step, host, mut child_assignments) = run_node(
                    names[0].clone(),
                    ctx.clone(),
                    fingerprint.clone(),
                    ordinal,
                    run_dir.clone(),
                    cancel.clone(),
                )
                .await?;
                let mut assignments = host
                    .map(|host| vec![HostAssignment { ordinal, label: names[0].clone(), host }])
                    .unwrap_or_default();
                assignments.append(&mut child_assignments);
                (assignments, vec![step])
            } else {
                let width = names.len();
                run_siblings(&names, ctx, fingerprint, ordinal, &run_dir, false, width, cancel.clone()).await?
            };

            let node_failed = node_steps.iter().any(|s| !s.succeeded());
            ordinal += node_steps.len();
            assignments.append(&mut node_assignments);
            steps.extend(node_steps);
            if node_failed {
                break;
            }
        }

        let finished_at = Utc::now();
        let result = TaskResult::from_steps(steps);
        ctx.log_store
            .write_summary(&run_dir, finished_at, result.clone())
            .await
            .map_err(|e| RrError::exec(format!("failed to write summary: {e}")))?;
        ctx.log_store
            .write_manifest(&run_dir, assignments)
            .await
            .map_err(|e| RrError::exec(format!("failed to write manifest: {e}")))?;

        tracing::info!(task = root, exit_code = result.exit_code, "task completed");
        Ok(TaskOutcome { result, run_dir })
    }

    /// Run `repeat` independent copies of `root` concurrently, bounded by
    /// `max_parallel` (default `min(repeat, |hosts|)`), for flake detection.
    pub async fn run_repeated(
        root: &str,
        ctx: &TaskEngineContext,
        fingerprint: &ProjectFingerprint,
        repeat: usize,
        max_parallel: Option<usize>,
        cancel: CancellationToken,
    ) -> Result<RepeatReport, RrError> {
        let width = max_parallel.unwrap_or_else(|| repeat.min(ctx.hosts.len().max(1))).max(1);
        let semaphore = Arc::new(Semaphore::new(width));
        let started = std::time::Instant::now();
        let (tx, mut rx) = mpsc::channel(repeat.max(1));

        for index in 0..repeat {
            let permit = semaphore.clone();
            let tx = tx.clone();
            let ctx = ctx.clone();
            let repetition_fingerprint = fingerprint.with_suffix(format!("repeat-{index}"));
            let cancel = cancel.clone();
            let task_name = root.to_string();
            tokio::spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore not closed");
                let outcome = TaskEngine::run_task(&task_name, &ctx, &repetition_fingerprint, cancel).await;
                let _ = tx.send((index, outcome)).await;
            });
        }
        drop(tx);

        let mut outcomes: Vec<Option<Result<TaskOutcome, RrError>>> = (0..repeat).map(|_| None).collect();
        while let Some((index, outcome)) = rx.recv().await {
            outcomes[index] = Some(outcome);
        }

        let mut successes = 0;
        let mut first_failure_ordinal = None;
        let mut assignments = Vec::new();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Some(Ok(task_outcome)) => {
                    if task_outcome.result.succeeded() {
                        successes += 1;
                    } else if first_failure_ordinal.is_none() {
                        first_failure_ordinal = Some(index);
                    }
                    assignments.push(HostAssignment {
                        ordinal: index,
                        label: format!("repeat-{index}"),
                        host: task_outcome.run_dir.task.clone(),
                    });
                }
                Some(Err(_)) | None => {
                    if first_failure_ordinal.is_none() {
                        first_failure_ordinal = Some(index);
                    }
                }
            }
        }

        Ok(RepeatReport {
            total: repeat,
            successes,
            first_failure_ordinal,
            elapsed: started.elapsed(),
            assignments,
        })
    }
}

fn restrict_hosts(
    hosts: &IndexMap<String, HostEntry>,
    restriction: &[String],
    task_name: &str,
) -> Result<IndexMap<String, HostEntry>, RrError> {
    if restriction.is_empty() {
        return Ok(hosts.clone());
    }
    let filtered: IndexMap<String, HostEntry> = hosts
        .iter()
        .filter(|(name, entry)| restriction.iter().any(|r| r == *name || entry.has_tag(r)))
        .map(|(n, e)| (n.clone(), e.clone()))
        .collect();
    if filtered.is_empty() {
        return Err(RrError::config(format!(
            "task '{task_name}' host restriction [{}] matches no configured host",
            restriction.join(", ")
        )));
    }
    Ok(filtered)
}

/// Stream command output into one merged, line-buffered log file (§6).
fn log_sink(path: PathBuf) -> (mpsc::Sender<OutputLine>, tokio::task::JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(256);
    let handle = tokio::spawn(async move {
        use tokio::io::AsyncWriteExt;
        let file = match tokio::fs::File::create(&path).await {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to open step log");
                while rx.recv().await.is_some() {}
                return;
            }
        };
        let mut writer = tokio::io::BufWriter::new(file);
        while let Some(line) = rx.recv().await {
            let text = match line {
                OutputLine::Stdout(l) => l,
                OutputLine::Stderr(l) => l,
            };
            let _ = writer.write_all(text.as_bytes()).await;
            let _ = writer.write_all(b"\n").await;
        }
        let _ = writer.flush().await;
    });
    (tx, handle)
}

/// Run one DAG-plan node's task body. Boxed because `Parallel` bodies
/// recurse back into this function for their children; takes fully owned
/// arguments so each concurrent sibling can be `tokio::spawn`ed
/// independently, matching the probe-fan-out pattern elsewhere in the stack.
fn run_node(
    name: String,
    ctx: TaskEngineContext,
    fingerprint: ProjectFingerprint,
    ordinal: usize,
    run_dir: RunDirectory,
    cancel: CancellationToken,
) -> Pin<Box<dyn Future<Output = Result<(StepResult, Option<String>, Vec<HostAssignment>), RrError>> + Send>> {
    Box::pin(async move {
        let spec = ctx.tasks.get(&name).ok_or_else(|| RrError::config(format!("unknown task '{name}'")))?.clone();
        let hosts = restrict_hosts(&ctx.hosts, &spec.host_restriction, &name)?;
        let started_at_ms = ctx.now_ms;

        match &spec.body {
            TaskBody::Orchestrator => Ok((
                StepResult {
                    ordinal,
                    name,
                    exit_code: 0,
                    started_at_ms,
                    finished_at_ms: started_at_ms,
                    log_path: PathBuf::new(),
                },
                None,
                Vec::new(),
            )),

            TaskBody::Run(command) => {
                let log_path = ctx.log_store.step_log_path(&run_dir, ordinal, &name);
                let (sink, writer) = log_sink(log_path.clone());
                let opts = ctx.workflow_opts();
                let report = Workflow::run(
                    &ctx.selector,
                    &hosts,
                    &fingerprint,
                    &ctx.holder,
                    &ctx.local_root,
                    &ctx.sync_rules,
                    ctx.lock_policy,
                    ctx.now_ms,
                    command,
                    &ctx.env,
                    None,
                    &opts,
                    sink,
                    cancel,
                )
                .await?;
                let _ = writer.await;
                let host = report.host.clone();
                Ok((
                    StepResult {
                        ordinal,
                        name,
                        exit_code: report.exit_code(),
                        started_at_ms,
                        finished_at_ms: ctx.now_ms,
                        log_path,
                    },
                    Some(host),
                    Vec::new(),
                ))
            }

            TaskBody::Steps(step_list) => {
                let log_path = ctx.log_store.step_log_path(&run_dir, ordinal, &name);
                let (sink, writer) = log_sink(log_path.clone());
                let opts = ctx.workflow_opts();
                let report = Workflow::run_steps(
                    &ctx.selector,
                    &hosts,
                    &fingerprint,
                    &ctx.holder,
                    &ctx.local_root,
                    &ctx.sync_rules,
                    ctx.lock_policy,
                    ctx.now_ms,
                    step_list,
                    &ctx.env,
                    None,
                    &opts,
                    |_, _| sink.clone(),
                    cancel,
                )
                .await?;
                let _ = writer.await;
                let host = report.host.clone();
                Ok((
                    StepResult {
                        ordinal,
                        name,
                        exit_code: report.exit_code(),
                        started_at_ms,
                        finished_at_ms: ctx.now_ms,
                        log_path,
                    },
                    Some(host),
                    Vec::new(),
                ))
            }

            TaskBody::Parallel(children) => {
                let max_parallel = spec.effective_max_parallel();
                let (assignments, results) = run_siblings_detached(
                    children.clone(),
                    ctx.clone(),
                    fingerprint.clone(),
                    ordinal,
                    run_dir.clone(),
                    spec.fail_fast,
                    max_parallel,
                    cancel,
                )
                .await?;

                let exit_code = results.iter().find(|s| !s.succeeded()).map(|s| s.exit_code).unwrap_or(0);
                Ok((
                    StepResult {
                        ordinal,
                        name,
                        exit_code,
                        started_at_ms,
                        finished_at_ms: ctx.now_ms,
                        log_path: PathBuf::new(),
                    },
                    None,
                    assignments,
                ))
            }
        }
    })
}

/// Run `names` concurrently as siblings (either a dependency `ParallelGroup`
/// or a `parallel` task body's children), bounded by `max_parallel`, honoring
/// `fail_fast`. Returns each sibling's `StepResult` in declaration order.
#[allow(clippy::too_many_arguments)]
async fn run_siblings(
    names: &[String],
    ctx: &TaskEngineContext,
    fingerprint: &ProjectFingerprint,
    base_ordinal: usize,
    run_dir: &RunDirectory,
    fail_fast: bool,
    max_parallel: usize,
    cancel: CancellationToken,
) -> Result<(Vec<HostAssignment>, Vec<StepResult>), RrError> {
    run_siblings_detached(
        names.to_vec(),
        ctx.clone(),
        fingerprint.clone(),
        base_ordinal,
        run_dir.clone(),
        fail_fast,
        max_parallel,
        cancel,
    )
    .await
}

/// Core fan-out: each sibling gets its own fingerprint suffix (so
/// multiplexed hosts don't collide on one lock, §4.7 "host assignment"),
/// runs under a semaphore of width `max_parallel`, and on the first failure
/// under `fail_fast` cancels the rest.
#[allow(clippy::too_many_arguments)]
async fn run_siblings_detached(
    names: Vec<String>,
    ctx: TaskEngineContext,
    fingerprint: ProjectFingerprint,
    base_ordinal: usize,
    run_dir: RunDirectory,
    fail_fast: bool,
    max_parallel: usize,
    cancel: CancellationToken,
) -> Result<(Vec<HostAssignment>, Vec<StepResult>), RrError> {
    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    let group_cancel = cancel.child_token();
    let (tx, mut rx) = mpsc::channel(names.len().max(1));

    for (index, name) in names.iter().enumerate() {
        let semaphore = semaphore.clone();
        let tx = tx.clone();
        let name = name.clone();
        let ctx = ctx.clone();
        let run_dir = run_dir.clone();
        let sibling_fingerprint = fingerprint.with_suffix(&name);
        let sibling_cancel = group_cancel.clone();
        tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
            let outcome = run_node(name, ctx, sibling_fingerprint, base_ordinal + index, run_dir, sibling_cancel).await;
            let _ = tx.send((index, outcome)).await;
        });
    }
    drop(tx);

    type SiblingOutcome = Result<(StepResult, Option<String>, Vec<HostAssignment>), RrError>;
    let mut slots: Vec<Option<SiblingOutcome>> = (0..names.len()).map(|_| None).collect();
    let mut remaining = names.len();
    while remaining > 0 {
        match rx.recv().await {
            Some((index, outcome)) => {
                let failed = matches!(&outcome, Ok((s, _, _)) if !s.succeeded()) || outcome.is_err();
                slots[index] = Some(outcome);
                remaining -= 1;
                if failed && fail_fast {
                    group_cancel.cancel();
                }
            }
            None => break,
        }
    }

    let mut assignments = Vec::new();
    let mut results = Vec::new();
    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(Ok((step, host, mut child_assignments))) => {
                if let Some(host) = host {
                    assignments.push(HostAssignment {
                        ordinal: step.ordinal,
                        label: names.get(index).cloned().unwrap_or_default(),
                        host,
                    });
                }
                assignments.append(&mut child_assignments);
                results.push(step);
            }
            Some(Err(e)) => return Err(e),
            None => {
                return Err(RrError::exec(format!("sibling #{index} did not report a result (cancelled)")));
            }
        }
    }
    Ok((assignments, results))
}

#[cfg(test)]
#[path = "task_engine_tests.rs"]
mod tests;
