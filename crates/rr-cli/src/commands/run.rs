// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rr run`/`rr exec`: one ad-hoc command through the full Workflow (§4.6).

use crate::commands::context::AppContext;
use crate::exit_error::ExitError;
use crate::output::{emit, OutputFormat};
use chrono::Utc;
use rr_core::{StepResult, TaskResult};
use rr_engine::{OutputLine, Workflow, WorkflowOptions};
use rr_storage::{HostAssignment, LogStore};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc;

pub struct RunArgs {
    pub command: String,
    pub skip_sync: bool,
    pub dry_run: bool,
    pub skip_lock: bool,
    pub pull: Vec<String>,
    pub pull_dest: Option<PathBuf>,
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct RunOutput {
    host: String,
    exit_code: i32,
    log_dir: PathBuf,
}

pub async fn run(ctx: AppContext, args: RunArgs) -> Result<(), ExitError> {
    let hosts = ctx.hosts();
    let started_at = Utc::now();
    let log_store = LogStore::new(ctx.local_root.join(".rr").join("runs"));
    let run_dir = log_store
        .create_run("adhoc", started_at)
        .await
        .map_err(|e| ExitError::new(rr_core::exit_code::GENERIC_FAILURE, e.to_string()))?;
    let log_path = log_store.step_log_path(&run_dir, 0, "adhoc");

    let (tx, mut rx) = mpsc::channel::<OutputLine>(256);
    let printer = tokio::spawn(async move {
        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::File::create(&log_path).await.ok();
        while let Some(line) = rx.recv().await {
            let (text, is_err) = match &line {
                OutputLine::Stdout(l) => (l.clone(), false),
                OutputLine::Stderr(l) => (l.clone(), true),
            };
            if is_err {
                eprintln!("{text}");
            } else {
                println!("{text}");
            }
            if let Some(f) = file.as_mut() {
                let _ = f.write_all(text.as_bytes()).await;
                let _ = f.write_all(b"\n").await;
            }
        }
    });

    let opts = WorkflowOptions {
        host: ctx.host_override.clone(),
        tag: ctx.tag_override.clone(),
        probe_timeout: ctx.config.probe_timeout,
        skip_sync: args.skip_sync,
        skip_lock: args.skip_lock,
        lock_enabled: ctx.lock_enabled(),
        dry_run: args.dry_run,
        pull_patterns: args.pull,
        pull_dest: args.pull_dest,
    };

    let report = Workflow::run(
        &ctx.selector,
        &hosts,
        &ctx.fingerprint,
        &ctx.holder,
        &ctx.local_root,
        &ctx.config.sync,
        ctx.lock_policy,
        ctx.now_ms,
        &args.command,
        &ctx.env,
        None,
        &opts,
        tx,
        crate::signal::cancel_on_ctrl_c(),
    )
    .await
    .map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;

    let _ = printer.await;

    if let Some(error) = &report.error {
        crate::output::emit_error(args.format, error);
        return Err(ExitError::from(error));
    }

    let exit_code = report.exit_code();
    let result = report.command_result.clone().map(|r| StepResult {
        ordinal: 0,
        name: "adhoc".to_string(),
        exit_code: r.exit_code,
        started_at_ms: ctx.now_ms,
        finished_at_ms: ctx.now_ms + r.duration.as_millis() as u64,
        log_path: run_dir.path.join("0-adhoc.log"),
    });
    let task_result = match result {
        Some(step) => TaskResult::from_steps(vec![step]),
        None => TaskResult::from_steps(Vec::new()),
    };
    log_store
        .write_summary(&run_dir, Utc::now(), task_result)
        .await
        .map_err(|e| ExitError::new(rr_core::exit_code::GENERIC_FAILURE, e.to_string()))?;
    log_store
        .write_manifest(&run_dir, vec![HostAssignment { ordinal: 0, label: "adhoc".to_string(), host: report.host.clone() }])
        .await
        .map_err(|e| ExitError::new(rr_core::exit_code::GENERIC_FAILURE, e.to_string()))?;

    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }

    emit(args.format, RunOutput { host: report.host.clone(), exit_code, log_dir: run_dir.path.clone() }, |out| {
        eprintln!("rr: {} on {} (exit {})", if out.exit_code == 0 { "ok" } else { "failed" }, out.host, out.exit_code);
    });

    if exit_code != 0 {
        return Err(ExitError::new(exit_code, format!("command exited with code {exit_code}")));
    }
    Ok(())
}
