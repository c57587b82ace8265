// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assembles the shared, per-invocation context every command needs: the
//! loaded project configuration, a Selector, the lock holder identity, and
//! the project fingerprint (§4.2, §4.4, §4.6).

use crate::config;
use anyhow::{Context as _, Result};
use indexmap::IndexMap;
use rr_adapters::{LockPolicy as AdapterLockPolicy, Selector};
use rr_core::{Clock, HostEntry, ProjectConfig, ProjectFingerprint, SystemClock, TaskSpec};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct AppContext {
    pub config: ProjectConfig,
    pub selector: Selector,
    pub holder: String,
    pub local_root: PathBuf,
    pub fingerprint: ProjectFingerprint,
    pub env: HashMap<String, String>,
    pub now_ms: u64,
    pub lock_policy: AdapterLockPolicy,
    pub host_override: Option<String>,
    pub tag_override: Option<String>,
}

impl AppContext {
    pub fn load(config_path: Option<PathBuf>, host: Option<String>, tag: Option<String>) -> Result<Self> {
        let local_root = std::env::current_dir().context("resolving current directory")?;
        let config = config::load_project(config_path.as_deref(), &local_root)?;
        let fingerprint = ProjectFingerprint::of(&local_root);
        let clock = SystemClock;
        let lock_policy =
            AdapterLockPolicy { timeout: config.lock.timeout, grace: config.lock.grace };

        Ok(Self {
            selector: Selector::new(Duration::from_secs(60)),
            holder: config::holder_identity(),
            local_root,
            fingerprint,
            env: HashMap::new(),
            now_ms: clock.epoch_ms(),
            lock_policy,
            host_override: host,
            tag_override: tag,
            config,
        })
    }

    pub fn hosts(&self) -> IndexMap<String, HostEntry> {
        self.config.hosts.clone()
    }

    pub fn tasks(&self) -> IndexMap<String, TaskSpec> {
        self.config.tasks.clone()
    }

    pub fn lock_enabled(&self) -> bool {
        self.config.lock.enabled
    }

    pub fn hosts_arc(&self) -> Arc<IndexMap<String, HostEntry>> {
        Arc::new(self.hosts())
    }
}
