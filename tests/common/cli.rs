//! CLI test runner with fluent assertions.
//!
//! Runs the `avatar` binary against an isolated data directory and
//! verifies output, exit codes and JSON responses in robot mode.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::cargo::CommandCargoExt;
use serde_json::Value;
use tempfile::TempDir;

/// Environment variables the binary reads; cleared so the host cannot leak in.
const ISOLATED_VARS: [&str; 4] = ["AVATAR_FORMAT", "AVATAR_CONFIG", "NO_COLOR", "RUST_LOG"];

/// Test runner for the `avatar` binary.
///
/// # Example
///
/// ```ignore
/// let cli = CliRunner::new();
/// cli.run(&["save", "42", "photo.jpg"])
///    .assert_success()
///    .assert_stdout_contains("saved");
/// ```
pub struct CliRunner {
    data_dir: TempDir,
    env_vars: HashMap<String, String>,
    use_data_dir_flag: bool,
}

impl Default for CliRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CliRunner {
    /// Create a runner with a fresh data directory and logging turned off.
    ///
    /// # Panics
    ///
    /// Panics if the temp directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let mut env_vars = HashMap::new();
        env_vars.insert("RUST_LOG".to_string(), "off".to_string());
        Self {
            data_dir: TempDir::new().expect("Failed to create temp directory"),
            env_vars,
            use_data_dir_flag: true,
        }
    }

    /// Add an environment variable for command execution.
    #[must_use]
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env_vars.insert(key.to_string(), value.to_string());
        self
    }

    /// Do not pass `--data-dir`; the test supplies the location another way.
    #[must_use]
    pub fn without_data_dir_flag(mut self) -> Self {
        self.use_data_dir_flag = false;
        self
    }

    /// The isolated data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        self.data_dir.path()
    }

    /// Path of the stored avatar for `user_id`.
    #[must_use]
    pub fn avatar_path(&self, user_id: &str) -> PathBuf {
        self.data_dir
            .path()
            .join("avatars")
            .join(user_id)
            .join("profile.png")
    }

    /// Execute the command with the given arguments.
    ///
    /// # Panics
    ///
    /// Panics if the binary cannot be found or started.
    #[must_use]
    pub fn run(&self, args: &[&str]) -> CliResult {
        let mut cmd = Command::cargo_bin("avatar").expect("avatar binary not built");
        for key in ISOLATED_VARS {
            cmd.env_remove(key);
        }
        cmd.env_remove("AVATAR_DATA_DIR");
        if self.use_data_dir_flag {
            cmd.arg("--data-dir").arg(self.data_dir.path());
        }
        cmd.args(args);
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }

        let output = cmd.output().expect("Failed to execute command");
        CliResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            args: args.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Execute with `--robot` flag for JSON output.
    #[must_use]
    pub fn run_robot(&self, args: &[&str]) -> CliResult {
        let mut full_args = vec!["--robot"];
        full_args.extend(args);
        self.run(&full_args)
    }
}

/// Captured output from CLI execution with fluent assertions.
#[derive(Debug, Clone)]
pub struct CliResult {
    /// Standard output captured from the command.
    pub stdout: String,
    /// Standard error captured from the command.
    pub stderr: String,
    /// Exit code from the command.
    pub exit_code: i32,
    /// Arguments passed to the command.
    pub args: Vec<String>,
}

impl CliResult {
    /// Check if the command succeeded (exit code 0).
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Assert the command succeeded.
    ///
    /// # Panics
    ///
    /// Panics if the command did not exit with code 0.
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.success(),
            "Command {:?} failed with exit code {}: {}",
            self.args,
            self.exit_code,
            self.stderr
        );
        self
    }

    /// Assert the command failed.
    ///
    /// # Panics
    ///
    /// Panics if the command exited with code 0.
    pub fn assert_failure(&self) -> &Self {
        assert!(
            !self.success(),
            "Command {:?} unexpectedly succeeded",
            self.args
        );
        self
    }

    /// Assert stdout contains the given text.
    ///
    /// # Panics
    ///
    /// Panics if stdout doesn't contain the text.
    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "stdout does not contain \"{text}\"\nActual stdout:\n{}",
            self.stdout
        );
        self
    }

    /// Assert stderr contains the given text.
    ///
    /// # Panics
    ///
    /// Panics if stderr doesn't contain the text.
    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "stderr does not contain \"{text}\"\nActual stderr:\n{}",
            self.stderr
        );
        self
    }

    /// Parse stdout as JSON.
    ///
    /// # Panics
    ///
    /// Panics if stdout is not valid JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_str(self.stdout.trim())
            .unwrap_or_else(|e| panic!("Failed to parse stdout as JSON: {e}\n{}", self.stdout))
    }

    /// Parse stderr as JSON (robot-mode errors).
    ///
    /// # Panics
    ///
    /// Panics if stderr is not valid JSON.
    #[must_use]
    pub fn stderr_json(&self) -> Value {
        serde_json::from_str(self.stderr.trim())
            .unwrap_or_else(|e| panic!("Failed to parse stderr as JSON: {e}\n{}", self.stderr))
    }

    /// Assert a JSON pointer in stdout has the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the value differs or is missing.
    pub fn assert_json_field(&self, json_pointer: &str, expected: &Value) -> &Self {
        let json = self.json();
        let actual = json
            .pointer(json_pointer)
            .unwrap_or_else(|| panic!("JSON pointer {json_pointer} not found in {json}"));
        assert_eq!(actual, expected, "Unexpected value at {json_pointer}");
        self
    }
}
