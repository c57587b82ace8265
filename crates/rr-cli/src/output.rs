// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Text/JSON output rendering (§4.11, §6, §9 — output mode is process-wide
//! and read-only once chosen).

use crate::exit_error::ExitError;
use clap::ValueEnum;
use rr_core::RrError;
use rr_wire::{Envelope, EnvelopeError};
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Emit a successful envelope in JSON mode, or hand `data` to `render` in
/// text mode. Mirrors the "one shape, two renderings" split used throughout
/// the CLI.
pub fn emit<T: Serialize>(format: OutputFormat, data: T, render: impl FnOnce(&T)) {
    match format {
        OutputFormat::Json => {
            let envelope = Envelope::ok(data);
            match serde_json::to_string_pretty(&envelope) {
                Ok(text) => println!("{text}"),
                Err(e) => eprintln!("failed to serialize output: {e}"),
            }
        }
        OutputFormat::Text => render(&data),
    }
}

/// Emit a failed envelope in JSON mode; in text mode the caller's own error
/// path (via `ExitError`'s `Display`) already prints the message to stderr,
/// so this only needs to cover JSON.
pub fn emit_error(format: OutputFormat, err: &RrError) {
    if format == OutputFormat::Json {
        let envelope = Envelope::<serde_json::Value>::from_error(err);
        if let Ok(text) = serde_json::to_string_pretty(&envelope) {
            println!("{text}");
        }
    } else {
        eprintln!("error: {err}");
        if let Some(suggestion) = &err.suggestion {
            eprintln!("  suggestion: {suggestion}");
        }
    }
}

/// Emit the top-level failure that ends the process: an `ExitError` raised
/// before or after a command ran. Unlike [`emit_error`] this has no
/// `RrError` to draw a `kind`/`details` from, so the JSON envelope carries
/// a bare `"fatal"` code.
pub fn emit_fatal(format: OutputFormat, err: &ExitError) {
    if format == OutputFormat::Json {
        let envelope = Envelope::<serde_json::Value> {
            success: false,
            data: None,
            error: Some(EnvelopeError {
                code: "fatal".to_string(),
                message: err.message.clone(),
                suggestion: None,
                details: None,
            }),
        };
        if let Ok(text) = serde_json::to_string_pretty(&envelope) {
            println!("{text}");
        }
    } else {
        eprintln!("error: {}", err.message);
    }
}
