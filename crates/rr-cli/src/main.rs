// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rr`: sync a local project to a remote host, lock it, run a command or a
//! declared task, optionally pull artifacts back, and unlock (§1, §6).

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod config;
mod exit_error;
mod output;
mod signal;

use crate::commands::context::AppContext;
use crate::exit_error::ExitError;
use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rr", version, about = "Sync, lock, and run commands on a remote host")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the project configuration file (default: ./rr.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Restrict host selection to this configured host name
    #[arg(long, global = true)]
    host: Option<String>,

    /// Restrict host selection to hosts carrying this tag
    #[arg(long, global = true)]
    tag: Option<String>,

    /// Emit machine-readable JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync, lock, run a command, pull, and unlock
    Run(RunCommandArgs),
    /// Like `run`, but skips the sync phase
    Exec(RunCommandArgs),
    /// Push the local project tree to the selected host
    Sync {
        /// Report what would transfer without modifying the remote
        #[arg(long)]
        dry_run: bool,
    },
    /// Fetch files matching patterns back from the selected host
    Pull {
        /// Remote glob patterns, relative to the project root
        patterns: Vec<String>,
        /// Local destination directory (default: project root)
        #[arg(long)]
        dest: Option<PathBuf>,
    },
    /// Run a declared task by name, walking its dependency graph
    Task {
        name: String,
        /// Run N independent copies concurrently for flake detection
        #[arg(long)]
        repeat: Option<usize>,
        /// Bound the repeat/parallel fan-out width
        #[arg(long)]
        max_parallel: Option<usize>,
    },
    /// Inspect or prune recorded run directories
    Log {
        #[command(subcommand)]
        command: LogCommand,
    },
}

#[derive(Subcommand, Debug)]
enum LogCommand {
    /// List run directories, newest first
    List,
    /// Delete run directories per the global retention policy
    Clean {
        /// Report what would be deleted without removing anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Args, Debug)]
struct RunCommandArgs {
    /// The shell command to run on the selected host
    command: String,
    /// Report what would transfer without modifying the remote
    #[arg(long)]
    dry_run: bool,
    /// Skip lock acquisition for this invocation
    #[arg(long)]
    skip_lock: bool,
    /// Remote glob pattern to pull back after a successful execute (repeatable)
    #[arg(long = "pull")]
    pull: Vec<String>,
    /// Local destination directory for pulled artifacts
    #[arg(long)]
    pull_dest: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let format = if cli.json { OutputFormat::Json } else { OutputFormat::Text };

    let result = dispatch(cli, format).await;
    if let Err(err) = result {
        output::emit_fatal(format, &err);
        std::process::exit(err.code);
    }
}

async fn dispatch(cli: Cli, format: OutputFormat) -> Result<(), ExitError> {
    let ctx = AppContext::load(cli.config, cli.host, cli.tag)
        .map_err(|e| ExitError::new(rr_core::exit_code::CONFIG_INVALID, e.to_string()))?;

    match cli.command {
        Command::Run(args) => {
            commands::run::run(
                ctx,
                commands::run::RunArgs {
                    command: args.command,
                    skip_sync: false,
                    dry_run: args.dry_run,
                    skip_lock: args.skip_lock,
                    pull: args.pull,
                    pull_dest: args.pull_dest,
                    format,
                },
            )
            .await
        }
        Command::Exec(args) => {
            commands::run::run(
                ctx,
                commands::run::RunArgs {
                    command: args.command,
                    skip_sync: true,
                    dry_run: args.dry_run,
                    skip_lock: args.skip_lock,
                    pull: args.pull,
                    pull_dest: args.pull_dest,
                    format,
                },
            )
            .await
        }
        Command::Sync { dry_run } => commands::sync::run(ctx, commands::sync::SyncArgs { dry_run, format }).await,
        Command::Pull { patterns, dest } => commands::pull::run(ctx, commands::pull::PullArgs { patterns, dest, format }).await,
        Command::Task { name, repeat, max_parallel } => {
            commands::task::run(ctx, commands::task::TaskArgs { name, repeat, max_parallel, format }).await
        }
        Command::Log { command } => match command {
            LogCommand::List => commands::log::list(ctx, commands::log::LogListArgs { format }).await,
            LogCommand::Clean { dry_run } => commands::log::clean(ctx, commands::log::LogCleanArgs { dry_run, format }).await,
        },
    }
}
