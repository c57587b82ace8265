// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rr pull`: fetch artifacts matching patterns back from the selected host
//! (§4.3, §4.6 pull phase in isolation).

use crate::commands::context::AppContext;
use crate::exit_error::ExitError;
use crate::output::{emit, OutputFormat};
use rr_adapters::{SelectPreferences, SyncEngine};
use serde::Serialize;
use std::path::PathBuf;

pub struct PullArgs {
    pub patterns: Vec<String>,
    pub dest: Option<PathBuf>,
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct PullOutput {
    host: String,
    transferred_bytes: u64,
    files_transferred: u64,
}

pub async fn run(ctx: AppContext, args: PullArgs) -> Result<(), ExitError> {
    if args.patterns.is_empty() {
        return Err(ExitError::new(rr_core::exit_code::CONFIG_INVALID, "rr pull requires at least one pattern"));
    }

    let hosts = ctx.hosts();
    let prefs = SelectPreferences {
        host: ctx.host_override.clone(),
        tag: ctx.tag_override.clone(),
        probe_timeout: ctx.config.probe_timeout,
        local_fallback: false,
        picker: None,
    };
    let (host_name, conn) = ctx
        .selector
        .select(&hosts, &prefs)
        .await
        .map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;

    if conn.is_local() {
        return Err(ExitError::new(rr_core::exit_code::CONFIG_INVALID, "cannot pull from the local pseudo-host"));
    }

    let dest = args.dest.clone().unwrap_or_else(|| ctx.local_root.clone());
    let stats = SyncEngine::pull(&conn, &args.patterns, &dest, &ctx.config.sync)
        .await
        .map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;

    emit(
        args.format,
        PullOutput { host: host_name.clone(), transferred_bytes: stats.transferred_bytes, files_transferred: stats.files_transferred },
        |out| println!("pulled {} file(s), {} byte(s) from {}", out.files_transferred, out.transferred_bytes, out.host),
    );
    Ok(())
}
