//! Shared scaffolding for the black-box CLI specs: a throwaway project
//! directory plus a fluent wrapper around the `rr` binary.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway directory standing in for a synced project tree.
pub struct Project {
    dir: TempDir,
}

impl Project {
    /// An empty project directory with no `rr.toml` yet.
    pub fn empty() -> Self {
        Self { dir: tempfile::tempdir().expect("create temp project dir") }
    }

    /// A project with a minimal single-host `rr.toml` already written.
    pub fn with_default_config() -> Self {
        let project = Self::empty();
        project.file(
            "rr.toml",
            r#"
            [hosts.build]
            aliases = ["127.0.0.1:2222"]
            dir = "/tmp/rr-spec"
            "#,
        );
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `rel` (created with any needed parent directories) under the
    /// project root.
    pub fn file(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, contents).expect("write project file");
        path
    }

    /// An `rr` invocation rooted at this project directory.
    pub fn rr(&self) -> CliCommand {
        let mut cmd = Command::cargo_bin("rr").expect("locate rr binary");
        cmd.current_dir(self.root());
        CliCommand { cmd }
    }
}

/// An `rr` invocation with no project directory — only useful for
/// commands that don't touch `rr.toml`, like `--help`/`--version`.
pub fn cli() -> CliCommand {
    CliCommand { cmd: Command::cargo_bin("rr").expect("locate rr binary") }
}

pub struct CliCommand {
    cmd: Command,
}

impl CliCommand {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    /// Run the command and assert it exited with status 0.
    pub fn passes(mut self) -> Outcome {
        let assert = self.cmd.assert().success();
        Outcome::from_assert(assert)
    }

    /// Run the command and assert it exited with a non-zero status.
    pub fn fails(mut self) -> Outcome {
        let assert = self.cmd.assert().failure();
        Outcome::from_assert(assert)
    }

    /// Run the command and assert it exited with exactly `code`.
    pub fn fails_with(mut self, code: i32) -> Outcome {
        let assert = self.cmd.assert().code(code);
        Outcome::from_assert(assert)
    }
}

/// Captured stdout/stderr from a finished invocation, for fluent assertions.
pub struct Outcome {
    stdout: String,
    stderr: String,
}

impl Outcome {
    fn from_assert(assert: assert_cmd::assert::Assert) -> Self {
        let output = assert.get_output().clone();
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(
            self.stdout.contains(needle),
            "expected stdout to contain {needle:?}, got:\n{}",
            self.stdout
        );
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(
            self.stderr.contains(needle),
            "expected stderr to contain {needle:?}, got:\n{}",
            self.stderr
        );
        self
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}
