// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed error taxonomy (§4.9) mapped to process exit codes and the
//! machine-readable envelope.

use crate::probe::ProbeOutcome;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Reserved process exit codes (§6).
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERIC_FAILURE: i32 = 1;
    pub const CONFIG_INVALID: i32 = 2;
    pub const LOCK_HELD: i32 = 75;
    pub const CANCELLED: i32 = 130;
    pub const TRANSPORT_LOSS: i32 = 255;
}

/// Stable error codes used in the machine-readable envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Probe,
    Sync,
    Lock,
    Exec,
    MissingTool,
    NotImplemented,
    Exit,
}

crate::simple_display! {
    ErrorKind {
        Config => "config",
        Probe => "ssh/probe",
        Sync => "sync",
        Lock => "lock",
        Exec => "exec",
        MissingTool => "missing-tool",
        NotImplemented => "not-implemented",
        Exit => "exit",
    }
}

impl ErrorKind {
    /// Whether callers may reasonably retry an operation that failed with
    /// this kind of error (§4.9).
    pub fn retryable(&self) -> bool {
        matches!(self, ErrorKind::Probe | ErrorKind::Lock)
    }
}

/// The root error type surfaced by every component. Carries a stable [`ErrorKind`]
/// code, a one-sentence message, an optional suggestion, an optional wrapped
/// cause, and optional structured details for the envelope.
#[derive(Debug, Error)]
pub struct RrError {
    pub kind: ErrorKind,
    pub message: String,
    pub suggestion: Option<String>,
    pub details: Option<Value>,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for RrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl RrError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), suggestion: None, details: None, cause: None }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn sync(message: impl Into<String>, exit_code: i32, diagnostic: impl Into<String>) -> Self {
        Self::new(ErrorKind::Sync, message).with_details(serde_json::json!({
            "tool_exit_code": exit_code,
            "diagnostic": diagnostic.into(),
        }))
    }

    pub fn lock(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Lock, message)
    }

    pub fn exec(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Exec, message)
    }

    pub fn missing_tool(tool: impl Into<String>, host: impl Into<String>, found_at_path: Option<String>) -> Self {
        let tool = tool.into();
        let host = host.into();
        let suggestion = found_at_path.as_ref().map(|p| {
            format!("'{tool}' was found at {p} — add it to PATH or set an absolute path")
        });
        let mut err = Self::new(ErrorKind::MissingTool, format!("'{tool}' not found on {host}"))
            .with_details(serde_json::json!({ "tool": tool, "host": host, "found_at_path": found_at_path }));
        if let Some(s) = suggestion {
            err = err.with_suggestion(s);
        }
        err
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotImplemented, message)
    }

    /// Carries a specific exit code without an accompanying message (§4.9 `exit`).
    pub fn exit_with(code: i32) -> Self {
        Self::new(ErrorKind::Exit, format!("exited with code {code}"))
            .with_details(serde_json::json!({ "exit_code": code }))
    }

    /// Host-selection failure enumerating the aliases tried and their reasons (§4.2).
    pub fn host_selection(host: impl Into<String>, tried: &[(String, ProbeOutcome)]) -> Self {
        let host = host.into();
        let details = serde_json::json!({
            "host": host,
            "tried": tried.iter().map(|(alias, outcome)| {
                serde_json::json!({ "alias": alias, "outcome": outcome.to_string() })
            }).collect::<Vec<_>>(),
        });
        let suggestion = tried.iter().find_map(|(_, outcome)| match outcome {
            ProbeOutcome::HostKeyMismatch => {
                Some("accept the remote host key, e.g. via `ssh-keyscan` or an interactive connect".to_string())
            }
            ProbeOutcome::AuthFailed => {
                Some("deploy your public key to the remote host's authorized_keys".to_string())
            }
            _ => None,
        });
        let mut err = Self::new(ErrorKind::Probe, format!("no reachable alias for host '{host}'"))
            .with_details(details);
        if let Some(s) = suggestion {
            err = err.with_suggestion(s);
        }
        err
    }

    /// Map this error to a process exit code (§6).
    pub fn exit_code(&self) -> i32 {
        match self.kind {
            ErrorKind::Config => exit_code::CONFIG_INVALID,
            ErrorKind::Lock if self.message.contains("timed out") => exit_code::LOCK_HELD,
            ErrorKind::Exit => self
                .details
                .as_ref()
                .and_then(|d| d.get("exit_code"))
                .and_then(|v| v.as_i64())
                .map(|c| c as i32)
                .unwrap_or(exit_code::GENERIC_FAILURE),
            _ => exit_code::GENERIC_FAILURE,
        }
    }
}

pub type RrResult<T> = Result<T, RrError>;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
