// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step and task result data model (§3).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of one step or repetition (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub ordinal: usize,
    pub name: String,
    pub exit_code: i32,
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
    pub log_path: PathBuf,
}

impl StepResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    pub fn duration_ms(&self) -> u64 {
        self.finished_at_ms.saturating_sub(self.started_at_ms)
    }
}

/// Aggregate result of an entire task run (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub exit_code: i32,
    /// Ordinal of the first failing step, or -1 if every step succeeded.
    pub failed_step: i64,
    pub steps: Vec<StepResult>,
}

impl TaskResult {
    pub fn success(steps: Vec<StepResult>) -> Self {
        Self { exit_code: 0, failed_step: -1, steps }
    }

    pub fn from_steps(steps: Vec<StepResult>) -> Self {
        match steps.iter().find(|s| !s.succeeded()) {
            Some(failed) => Self {
                exit_code: failed.exit_code,
                failed_step: failed.ordinal as i64,
                steps,
            },
            None => Self::success(steps),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
