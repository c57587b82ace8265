// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only configuration shape the core consumes (§6, §10).
//!
//! The loader/validator that produces these values from a project file on
//! disk is an external collaborator; nothing here parses TOML/HCL.

use crate::host::HostEntry;
use crate::task::TaskSpec;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-project configuration (§10).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub hosts: IndexMap<String, HostEntry>,
    #[serde(default)]
    pub default_host: Option<String>,
    #[serde(default = "default_probe_timeout", with = "duration_secs")]
    pub probe_timeout: Duration,
    #[serde(default)]
    pub lock: LockPolicy,
    #[serde(default)]
    pub sync: SyncRules,
    #[serde(default)]
    pub tasks: IndexMap<String, TaskSpec>,
    #[serde(default)]
    pub output: OutputPreferences,
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

impl ProjectConfig {
    pub fn empty() -> Self {
        Self {
            hosts: IndexMap::new(),
            default_host: None,
            probe_timeout: default_probe_timeout(),
            lock: LockPolicy::default(),
            sync: SyncRules::default(),
            tasks: IndexMap::new(),
            output: OutputPreferences::default(),
        }
    }
}

/// Lock acquisition policy (§4.4, §10).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LockPolicy {
    pub enabled: bool,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    #[serde(with = "duration_secs")]
    pub grace: Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self { enabled: true, timeout: Duration::from_secs(30), grace: Duration::from_secs(15) }
    }
}

/// Include/exclude rules passed through verbatim to the incremental-copy tool (§4.3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncRules {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Output preferences consumed by the CLI rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputPreferences {
    pub json: bool,
    pub color: bool,
}

impl Default for OutputPreferences {
    fn default() -> Self {
        Self { json: false, color: true }
    }
}

/// Global (cross-project) configuration (§10).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub retention: RetentionPolicy,
    #[serde(default)]
    pub host_defaults: HostDefaults,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self { retention: RetentionPolicy::default(), host_defaults: HostDefaults::default() }
    }
}

/// LogStore retention policy (§4.8).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub max_size_mb: Option<u64>,
    pub keep_days: Option<u32>,
    pub keep_runs: Option<u32>,
}

/// Defaults merged into any `HostEntry` that omits them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostDefaults {
    #[serde(default)]
    pub tags: Vec<String>,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
