// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rr task <name>`: dependency-resolved multi-node task dispatch, with
//! optional `--repeat` flake-detection fan-out (§4.7).

use crate::commands::context::AppContext;
use crate::exit_error::ExitError;
use crate::output::{emit, OutputFormat};
use rr_adapters::Selector;
use rr_core::ProjectFingerprint;
use rr_engine::task_engine::{TaskEngine, TaskEngineContext};
use rr_storage::LogStore;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct TaskArgs {
    pub name: String,
    pub repeat: Option<usize>,
    pub max_parallel: Option<usize>,
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct TaskOutput {
    task: String,
    exit_code: i32,
    log_dir: PathBuf,
}

#[derive(Serialize)]
struct RepeatOutput {
    task: String,
    total: usize,
    successes: usize,
    first_failure_ordinal: Option<usize>,
    exit_code: i32,
}

pub async fn run(ctx: AppContext, args: TaskArgs) -> Result<(), ExitError> {
    if !ctx.config.tasks.contains_key(&args.name) {
        return Err(ExitError::new(
            rr_core::exit_code::CONFIG_INVALID,
            format!("unknown task '{}'", args.name),
        ));
    }

    let log_store = LogStore::new(ctx.local_root.join(".rr").join("runs"));
    let engine_ctx = TaskEngineContext {
        selector: Arc::new(Selector::new(Duration::from_secs(60))),
        hosts: ctx.hosts_arc(),
        tasks: Arc::new(ctx.tasks()),
        holder: Arc::from(ctx.holder.as_str()),
        local_root: Arc::new(ctx.local_root.clone()),
        sync_rules: Arc::new(ctx.config.sync.clone()),
        lock_policy: ctx.lock_policy,
        log_store: Arc::new(log_store),
        env: Arc::new(ctx.env.clone()),
        now_ms: ctx.now_ms,
        probe_timeout: ctx.config.probe_timeout,
        lock_enabled: ctx.lock_enabled(),
    };
    let fingerprint = ProjectFingerprint::of(&ctx.local_root);
    let cancel = crate::signal::cancel_on_ctrl_c();

    if let Some(repeat) = args.repeat {
        let report = TaskEngine::run_repeated(&args.name, &engine_ctx, &fingerprint, repeat, args.max_parallel, cancel)
            .await
            .map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;

        let exit_code = report.exit_code();
        emit(
            args.format,
            RepeatOutput {
                task: args.name.clone(),
                total: report.total,
                successes: report.successes,
                first_failure_ordinal: report.first_failure_ordinal,
                exit_code,
            },
            |out| {
                println!(
                    "{}/{} succeeded (task {}), elapsed {}",
                    out.successes,
                    out.total,
                    out.task,
                    rr_core::format_elapsed(report.elapsed.as_secs())
                );
            },
        );
        if exit_code != 0 {
            return Err(ExitError::new(exit_code, format!("{}/{} repetitions failed", report.total - report.successes, report.total)));
        }
        return Ok(());
    }

    let outcome = TaskEngine::run_task(&args.name, &engine_ctx, &fingerprint, cancel)
        .await
        .map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;
    let exit_code = outcome.result.exit_code;

    emit(
        args.format,
        TaskOutput { task: args.name.clone(), exit_code, log_dir: outcome.run_dir.path.clone() },
        |out| println!("task '{}' finished with exit code {} ({})", out.task, out.exit_code, out.log_dir.display()),
    );

    if exit_code != 0 {
        return Err(ExitError::new(exit_code, format!("task '{}' failed", args.name)));
    }
    Ok(())
}
