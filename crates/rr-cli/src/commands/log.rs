// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rr log list` / `rr log clean`: inspect and prune run directories against
//! the global retention policy (§4.8).

use crate::commands::context::AppContext;
use crate::exit_error::ExitError;
use crate::output::{emit, OutputFormat};
use rr_storage::{select_for_deletion, LogStore};
use serde::Serialize;

pub struct LogListArgs {
    pub format: OutputFormat,
}

pub struct LogCleanArgs {
    pub dry_run: bool,
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct RunSummary {
    name: String,
    task: Option<String>,
    size_bytes: u64,
}

#[derive(Serialize)]
struct CleanOutput {
    deleted: Vec<String>,
    dry_run: bool,
}

fn log_store(ctx: &AppContext) -> LogStore {
    LogStore::new(ctx.local_root.join(".rr").join("runs"))
}

pub async fn list(ctx: AppContext, args: LogListArgs) -> Result<(), ExitError> {
    let store = log_store(&ctx);
    let entries = store.list().await.map_err(|e| ExitError::new(rr_core::exit_code::GENERIC_FAILURE, e.to_string()))?;
    let summaries: Vec<RunSummary> =
        entries.iter().map(|e| RunSummary { name: e.name.clone(), task: e.task.clone(), size_bytes: e.size_bytes }).collect();

    emit(args.format, summaries, |list| {
        if list.is_empty() {
            println!("no runs recorded");
        }
        for entry in list {
            println!("{}\t{}\t{} bytes", entry.name, entry.task.as_deref().unwrap_or("-"), entry.size_bytes);
        }
    });
    Ok(())
}

pub async fn clean(ctx: AppContext, args: LogCleanArgs) -> Result<(), ExitError> {
    let global = crate::config::load_global().map_err(|e| ExitError::new(rr_core::exit_code::CONFIG_INVALID, e.to_string()))?;
    let store = log_store(&ctx);
    let entries = store.list().await.map_err(|e| ExitError::new(rr_core::exit_code::GENERIC_FAILURE, e.to_string()))?;
    let doomed = select_for_deletion(&entries, &global.retention, std::time::SystemTime::now());

    let mut deleted = Vec::new();
    for path in &doomed {
        if !args.dry_run {
            if let Err(e) = tokio::fs::remove_dir_all(path).await {
                eprintln!("warning: failed to remove {}: {e}", path.display());
                continue;
            }
        }
        deleted.push(path.display().to_string());
    }

    emit(args.format, CleanOutput { deleted: deleted.clone(), dry_run: args.dry_run }, |out| {
        let verb = if out.dry_run { "would delete" } else { "deleted" };
        println!("{verb} {} run director{}", out.deleted.len(), if out.deleted.len() == 1 { "y" } else { "ies" });
        for path in &out.deleted {
            println!("  {path}");
        }
    });
    Ok(())
}
