// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run log directory layout: step logs, `summary.json`, `manifest.json` (§4.8, §6).

use chrono::{DateTime, Utc};
use rr_core::TaskResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogStoreError {
    #[error("failed to create run directory {path}: {source}")]
    CreateDir { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("malformed manifest at {path}: {source}")]
    Malformed { path: PathBuf, #[source] source: serde_json::Error },
}

/// A single run's log directory, created once at the start of a task run.
#[derive(Debug, Clone)]
pub struct RunDirectory {
    pub path: PathBuf,
    pub task: String,
    pub started_at: DateTime<Utc>,
}

/// `manifest.json`: which host each step/repetition ran on (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub task: String,
    pub assignments: Vec<HostAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostAssignment {
    pub ordinal: usize,
    pub label: String,
    pub host: String,
}

/// `summary.json`: the task's aggregate result (§4.8, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub task: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub result: TaskResult,
}

/// Directory listing entry, for `rr log list` and retention (§4.8).
#[derive(Debug, Clone)]
pub struct RunEntry {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified_at: std::time::SystemTime,
    pub task: Option<String>,
}

pub struct LogStore {
    base: PathBuf,
}

impl LogStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Create `<base>/<task>-<RFC3339-timestamp>/`. Colons in the timestamp
    /// are replaced with `-` for filesystem safety; the true RFC3339 value is
    /// preserved in `summary.json`/`manifest.json`.
    pub async fn create_run(&self, task: &str, started_at: DateTime<Utc>) -> Result<RunDirectory, LogStoreError> {
        let stamp = started_at.to_rfc3339().replace(':', "-");
        let dir_name = format!("{task}-{stamp}");
        let path = self.base.join(dir_name);
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|source| LogStoreError::CreateDir { path: path.clone(), source })?;
        tracing::debug!(task, path = %path.display(), "run directory created");
        Ok(RunDirectory { path, task: task.to_string(), started_at })
    }

    pub fn step_log_path(&self, run: &RunDirectory, ordinal: usize, label: &str) -> PathBuf {
        run.path.join(format!("{ordinal}-{}.log", sanitize(label)))
    }

    pub async fn write_summary(
        &self,
        run: &RunDirectory,
        finished_at: DateTime<Utc>,
        result: TaskResult,
    ) -> Result<(), LogStoreError> {
        let summary = Summary { task: run.task.clone(), started_at: run.started_at, finished_at, result };
        let path = run.path.join("summary.json");
        let body = serde_json::to_vec_pretty(&summary).expect("Summary serializes");
        tokio::fs::write(&path, body).await.map_err(|source| LogStoreError::Write { path, source })
    }

    pub async fn write_manifest(&self, run: &RunDirectory, assignments: Vec<HostAssignment>) -> Result<(), LogStoreError> {
        let manifest = Manifest { task: run.task.clone(), assignments };
        let path = run.path.join("manifest.json");
        let body = serde_json::to_vec_pretty(&manifest).expect("Manifest serializes");
        tokio::fs::write(&path, body).await.map_err(|source| LogStoreError::Write { path, source })
    }

    /// List run directories newest-first.
    pub async fn list(&self) -> Result<Vec<RunEntry>, LogStoreError> {
        let mut entries = Vec::new();
        let mut read_dir = match tokio::fs::read_dir(&self.base).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(source) => return Err(LogStoreError::Read { path: self.base.clone(), source }),
        };

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|source| LogStoreError::Read { path: self.base.clone(), source })?
        {
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_dir() => m,
                _ => continue,
            };
            let size_bytes = dir_size(&path).await;
            let task = read_manifest_task(&path).await;
            entries.push(RunEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                path,
                size_bytes,
                modified_at: metadata.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
                task,
            });
        }

        entries.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        Ok(entries)
    }
}

fn sanitize(label: &str) -> String {
    label.chars().map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect()
}

async fn dir_size(path: &Path) -> u64 {
    let mut total = 0u64;
    let mut stack = vec![path.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(mut read_dir) = tokio::fs::read_dir(&dir).await else { continue };
        while let Ok(Some(entry)) = read_dir.next_entry().await {
            if let Ok(metadata) = entry.metadata().await {
                if metadata.is_dir() {
                    stack.push(entry.path());
                } else {
                    total += metadata.len();
                }
            }
        }
    }
    total
}

async fn read_manifest_task(run_dir: &Path) -> Option<String> {
    let contents = tokio::fs::read(run_dir.join("manifest.json")).await.ok()?;
    let manifest: Manifest = serde_json::from_slice(&contents).ok()?;
    Some(manifest.task)
}

#[cfg(test)]
#[path = "log_store_tests.rs"]
mod tests;
