// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rr-adapters: external collaborators — secure-shell dialing, the
//! incremental-copy tool, and the remote lock file protocol.

pub mod connection;
pub mod locker;
pub mod probe;
pub mod selector;
pub mod subprocess;
pub mod sync;

pub use connection::{Connection, RemoteSession};
pub use locker::{LockHandle, LockPolicy, Locker};
pub use selector::{SelectPreferences, Selector};
pub use sync::{SyncEngine, SyncStats};
