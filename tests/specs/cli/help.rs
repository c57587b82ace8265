//! Help/usage output specs.

use crate::prelude::*;

#[test]
fn rr_help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn rr_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("rr");
}

#[test]
fn rr_run_help_shows_usage() {
    cli().args(&["run", "--help"]).passes().stdout_has("Usage:");
}

#[test]
fn rr_exec_help_mentions_skip_sync_semantics() {
    cli().args(&["exec", "--help"]).passes().stdout_has("skips the sync phase");
}

#[test]
fn rr_task_help_shows_repeat_flag() {
    cli().args(&["task", "--help"]).passes().stdout_has("--repeat");
}

#[test]
fn rr_log_help_shows_subcommands() {
    cli().args(&["log", "--help"]).passes().stdout_has("list").stdout_has("clean");
}

#[test]
fn rr_no_args_fails_with_usage() {
    cli().fails().stderr_has("Usage:");
}
