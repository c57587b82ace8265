// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rr-storage: per-run log directories and retention (§4.8).

pub mod log_store;
pub mod retention;

pub use log_store::{HostAssignment, LogStore, LogStoreError, Manifest, RunDirectory, RunEntry, Summary};
pub use retention::select_for_deletion;
