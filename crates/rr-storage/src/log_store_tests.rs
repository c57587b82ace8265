// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rr_core::{StepResult, TaskResult};
use tempfile::tempdir;

fn step(ordinal: usize) -> StepResult {
    StepResult {
        ordinal,
        name: format!("step-{ordinal}"),
        exit_code: 0,
        started_at_ms: 0,
        finished_at_ms: 10,
        log_path: PathBuf::from(format!("{ordinal}.log")),
    }
}

#[tokio::test]
async fn create_run_makes_a_directory_named_after_the_task_and_timestamp() {
    let base = tempdir().unwrap();
    let store = LogStore::new(base.path());
    let run = store.create_run("deploy", Utc::now()).await.unwrap();
    assert!(run.path.is_dir());
    assert!(run.path.file_name().unwrap().to_str().unwrap().starts_with("deploy-"));
}

#[tokio::test]
async fn write_summary_and_manifest_round_trip() {
    let base = tempdir().unwrap();
    let store = LogStore::new(base.path());
    let run = store.create_run("deploy", Utc::now()).await.unwrap();

    store
        .write_summary(&run, Utc::now(), TaskResult::success(vec![step(0), step(1)]))
        .await
        .unwrap();
    store
        .write_manifest(&run, vec![HostAssignment { ordinal: 0, label: "0-build".into(), host: "build01".into() }])
        .await
        .unwrap();

    let summary_raw = tokio::fs::read_to_string(run.path.join("summary.json")).await.unwrap();
    let summary: Summary = serde_json::from_str(&summary_raw).unwrap();
    assert_eq!(summary.task, "deploy");
    assert_eq!(summary.result.steps.len(), 2);

    let manifest_raw = tokio::fs::read_to_string(run.path.join("manifest.json")).await.unwrap();
    let manifest: Manifest = serde_json::from_str(&manifest_raw).unwrap();
    assert_eq!(manifest.assignments[0].host, "build01");
}

#[tokio::test]
async fn step_log_path_sanitizes_label() {
    let base = tempdir().unwrap();
    let store = LogStore::new(base.path());
    let run = store.create_run("deploy", Utc::now()).await.unwrap();
    let path = store.step_log_path(&run, 3, "build:docker/image");
    assert_eq!(path.file_name().unwrap().to_str().unwrap(), "3-build_docker_image.log");
}

#[tokio::test]
async fn list_returns_runs_newest_first() {
    let base = tempdir().unwrap();
    let store = LogStore::new(base.path());
    let old = store.create_run("deploy", Utc::now() - chrono::Duration::hours(2)).await.unwrap();
    store.write_manifest(&old, vec![]).await.unwrap();
    let young = store.create_run("deploy", Utc::now()).await.unwrap();
    store.write_manifest(&young, vec![]).await.unwrap();
    // Force distinct mtimes regardless of filesystem timestamp resolution.
    filetime_touch(&old.path, std::time::SystemTime::now() - std::time::Duration::from_secs(3600));

    let entries = store.list().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, young.path.file_name().unwrap().to_str().unwrap());
}

#[tokio::test]
async fn list_on_missing_base_dir_is_empty_not_an_error() {
    let base = tempdir().unwrap();
    let store = LogStore::new(base.path().join("does-not-exist"));
    assert!(store.list().await.unwrap().is_empty());
}

fn filetime_touch(path: &Path, mtime: std::time::SystemTime) {
    let file = std::fs::File::open(path).unwrap();
    file.set_modified(mtime).ok();
}
