// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rr sync`: push the local tree to the selected host without locking or
//! executing anything (§4.3, §4.6 push phase in isolation).

use crate::commands::context::AppContext;
use crate::exit_error::ExitError;
use crate::output::{emit, OutputFormat};
use rr_adapters::{SelectPreferences, SyncEngine};
use serde::Serialize;

pub struct SyncArgs {
    pub dry_run: bool,
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct SyncOutput {
    host: String,
    would_transfer_bytes: u64,
    transferred_bytes: u64,
    files_transferred: u64,
}

pub async fn run(ctx: AppContext, args: SyncArgs) -> Result<(), ExitError> {
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
        return Err(ExitError::new(rr_core::exit_code::CONFIG_INVALID, "cannot sync to the local pseudo-host"));
    }

    let stats = SyncEngine::push(
        &conn,
        &ctx.local_root,
        conn.remote_dir().unwrap_or_default(),
        &ctx.config.sync,
        args.dry_run,
    )
    .await
    .map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;

    emit(
        args.format,
        SyncOutput {
            host: host_name.clone(),
            would_transfer_bytes: stats.would_transfer_bytes,
            transferred_bytes: stats.transferred_bytes,
            files_transferred: stats.files_transferred,
        },
        |out| {
            if args.dry_run {
                println!("would transfer {} file(s), {} byte(s) to {}", out.files_transferred, out.would_transfer_bytes, out.host);
            } else {
                println!("transferred {} file(s), {} byte(s) to {}", out.files_transferred, out.transferred_bytes, out.host);
            }
        },
    );
    Ok(())
}
