// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires Ctrl-C into a [`CancellationToken`] so a run/task invocation can
//! escalate cleanly instead of leaving the remote side running (§4.5, §4.7).

use tokio_util::sync::CancellationToken;

/// A token that cancels itself the first time the process receives Ctrl-C.
/// If the signal handler itself fails to install, the token is simply never
/// cancelled by this path — the command still runs to completion.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancelled = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancelled.cancel();
        }
    });
    token
}
