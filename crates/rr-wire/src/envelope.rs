// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `--json` output envelope (§4.11): a single top-level shape so callers
//! can script against stdout without parsing human-facing text.

use rr_core::RrError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level machine-readable result. Exactly one of `data`/`error` is set,
/// mirroring `success`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EnvelopeError>,
}

/// Error shape embedded in a failed envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }
}

impl Envelope<Value> {
    /// Build a data-less error envelope from a core [`RrError`] (§4.9, §4.11).
    pub fn from_error(err: &RrError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(EnvelopeError {
                code: err.kind.to_string(),
                message: err.message.clone(),
                suggestion: err.suggestion.clone(),
                details: err.details.clone(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
