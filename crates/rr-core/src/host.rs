// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host pool data model (§3).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One configured remote host: a name, an ordered list of addressable
/// aliases, a remote base directory, and optional tags/env overrides.
///
/// Invariant: `aliases` is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEntry {
    pub aliases: Vec<String>,
    pub dir: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl HostEntry {
    pub fn new(aliases: Vec<String>, dir: impl Into<String>) -> Self {
        Self { aliases, dir: dir.into(), tags: Vec::new(), env: HashMap::new() }
    }

    /// `true` if this entry satisfies the invariant that at least one alias
    /// is declared. A config loader must reject entries that fail this, but
    /// the core re-checks it defensively before using a host.
    pub fn has_alias(&self) -> bool {
        !self.aliases.is_empty()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A host entry together with its stable name, as handed to the Selector.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedHost {
    pub name: String,
    pub entry: HostEntry,
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
