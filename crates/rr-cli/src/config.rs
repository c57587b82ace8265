// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loads `ProjectConfig`/`GlobalConfig` from TOML on disk and derives the
//! lock holder identity (§6, §10 — this core never parses a file itself).

use anyhow::{Context, Result};
use rr_core::{GlobalConfig, ProjectConfig};
use std::path::{Path, PathBuf};

pub const PROJECT_CONFIG_FILE: &str = "rr.toml";
pub const GLOBAL_CONFIG_FILE: &str = "config.toml";

/// Load the project configuration from `explicit_path` if given, else
/// `<cwd>/rr.toml`.
pub fn load_project(explicit_path: Option<&Path>, cwd: &Path) -> Result<ProjectConfig> {
    let path = match explicit_path {
        Some(p) => p.to_path_buf(),
        None => cwd.join(PROJECT_CONFIG_FILE),
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading project config at {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing project config at {}", path.display()))
}

/// Load the global (cross-project) configuration from `~/.config/rr/config.toml`,
/// falling back to defaults if it doesn't exist.
pub fn load_global() -> Result<GlobalConfig> {
    let Some(path) = global_config_path() else {
        return Ok(GlobalConfig::default());
    };
    match std::fs::read_to_string(&path) {
        Ok(text) => toml::from_str(&text).with_context(|| format!("parsing global config at {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(GlobalConfig::default()),
        Err(e) => Err(e).with_context(|| format!("reading global config at {}", path.display())),
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rr").join(GLOBAL_CONFIG_FILE))
}

/// The opaque holder identity written into lock files: `user@hostname:pid`
/// (§4.4 lock.rs doc comment convention).
pub fn holder_identity() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let host = hostname();
    format!("{user}@{host}:{}", std::process::id())
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_project_parses_minimal_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rr.toml");
        std::fs::write(
            &path,
            r#"
            [hosts.build]
            aliases = ["build.internal"]
            dir = "/srv/app"
            "#,
        )
        .unwrap();

        let config = load_project(Some(&path), dir.path()).unwrap();
        assert!(config.hosts.contains_key("build"));
        assert_eq!(config.hosts["build"].aliases, vec!["build.internal".to_string()]);
    }

    #[test]
    fn load_project_errors_on_missing_file() {
        let dir = tempdir().unwrap();
        assert!(load_project(None, dir.path()).is_err());
    }

    #[test]
    fn load_global_defaults_when_absent() {
        let config = load_global().unwrap();
        assert!(config.retention.keep_runs.is_none());
    }

    #[test]
    fn holder_identity_contains_pid() {
        let holder = holder_identity();
        assert!(holder.contains(&std::process::id().to_string()));
    }
}
