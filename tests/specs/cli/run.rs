//! Specs for the error paths reachable without a live remote host: missing
//! config, unknown task names, and the retention/log commands against an
//! empty run store.

use crate::prelude::*;

#[test]
fn run_without_config_fails_with_config_invalid_exit_code() {
    let project = Project::empty();
    project.rr().args(&["run", "echo hi"]).fails_with(2).stderr_has("rr.toml");
}

#[test]
fn exec_without_config_fails_with_config_invalid_exit_code() {
    let project = Project::empty();
    project.rr().args(&["exec", "echo hi"]).fails_with(2);
}

#[test]
fn task_rejects_unknown_task_name() {
    let project = Project::with_default_config();
    project.rr().args(&["task", "does-not-exist"]).fails().stderr_has("does-not-exist");
}

#[test]
fn pull_rejects_empty_pattern_list() {
    let project = Project::with_default_config();
    project.rr().args(&["pull"]).fails();
}

#[test]
fn log_list_on_empty_project_reports_no_runs() {
    let project = Project::with_default_config();
    project.rr().args(&["log", "list"]).passes().stdout_has("no runs recorded");
}

#[test]
fn log_clean_dry_run_on_empty_project_deletes_nothing() {
    let project = Project::with_default_config();
    project
        .rr()
        .args(&["log", "clean", "--dry-run"])
        .passes()
        .stdout_has("would delete 0 run");
}

#[test]
fn json_mode_emits_an_envelope_on_config_error() {
    let project = Project::empty();
    project
        .rr()
        .args(&["--json", "run", "echo hi"])
        .fails_with(2)
        .stdout_has("\"success\": false");
}
