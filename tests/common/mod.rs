//! Common test utilities for issueflow integration tests.
//!
//! Provides `TestEnv` for isolated test environments that never read the
//! user's `~/.config/issueflow/config.kdl` or tracker credentials.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// Environment variables that would leak the caller's configuration into a test.
const CONFIG_VARS: &[&str] = &[
    "JIRA_BASE_URL",
    "JIRA_EMAIL",
    "JIRA_API_TOKEN",
    "JQL_FILTER",
    "IFLOW_STORY_POINTS_FIELD",
    "IFLOW_PAGE_SIZE",
    "IFLOW_TIMEOUT_SECS",
    "IFLOW_CONFIG",
    "IFLOW_LOG",
];

/// Loopback URL that refuses connections immediately.
pub const UNREACHABLE_URL: &str = "https://127.0.0.1:1";

/// A test environment with an isolated working directory and config path.
///
/// The `iflow()` method returns a `Command` with every configuration
/// variable removed and `IFLOW_CONFIG` pointing into the temp directory,
/// making tests parallel-safe.
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with no config file.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Create an environment whose credentials point at an unreachable tracker.
    pub fn unreachable() -> Self {
        let env = Self::new();
        env.write_config(&format!(
            "base-url \"{}\"\nemail \"me@example.com\"\napi-token \"test-token-1234\"\ntimeout-secs 2\n",
            UNREACHABLE_URL
        ));
        env
    }

    /// Get a Command for the iflow binary with isolated configuration.
    pub fn iflow(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_iflow"));
        cmd.current_dir(self.dir.path());
        for var in CONFIG_VARS {
            cmd.env_remove(var);
        }
        cmd.env("IFLOW_CONFIG", self.config_path());
        cmd
    }

    /// Path of the config file used by `iflow()`.
    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.kdl")
    }

    /// Write the config file.
    pub fn write_config(&self, kdl: &str) {
        std::fs::write(self.config_path(), kdl).unwrap();
    }

    /// Write a records file and return its path.
    pub fn write_records(&self, name: &str, records: &serde_json::Value) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, records.to_string()).unwrap();
        path
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a command's stdout as JSON.
pub fn stdout_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).unwrap()
}
