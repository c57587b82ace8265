// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project fingerprint: the lock identity basis (§3, §4.4, GLOSSARY).

use std::path::{Path, PathBuf};

/// Normalized absolute path of a local working directory, used as the lock
/// identity for a (host, project) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ProjectFingerprint(String);

impl ProjectFingerprint {
    /// Normalize `path` (canonicalize if it exists, otherwise lexically clean)
    /// into a stable fingerprint string.
    pub fn of(path: &Path) -> Self {
        let canonical = path.canonicalize().unwrap_or_else(|_| lexical_clean(path));
        Self(canonical.to_string_lossy().replace('\\', "/"))
    }

    /// Build a fingerprint with a run-id suffix, used by fan-out repetitions
    /// so sibling runs against the same project don't collide on one lock (§4.7).
    pub fn with_suffix(&self, suffix: impl AsRef<str>) -> Self {
        Self(format!("{}#{}", self.0, suffix.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        use std::path::Component;
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
#[path = "fingerprint_tests.rs"]
mod tests;
