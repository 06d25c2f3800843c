//! Subprocess-backed command runner.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::CommandSpec;
use crate::error::{ToolchainError, ToolchainResult};
use crate::runner::{CommandRunner, ExecutionResult};

/// Runs commands as child processes with captured output.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout_seconds: u64,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(600)
    }
}

impl ProcessRunner {
    /// Create a runner whose commands are killed after `timeout_seconds` (0 = no timeout).
    pub fn new(timeout_seconds: u64) -> Self {
        Self { timeout_seconds }
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &CommandSpec, workdir: &Path) -> ToolchainResult<ExecutionResult> {
        let cmd_str = command.to_string();
        debug!("Executing in {:?}: {}", workdir, cmd_str);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| ToolchainError::Spawn {
            program: command.program.clone(),
            source: e,
        })?;

        let started_at = Utc::now();
        let output = if self.timeout_seconds > 0 {
            let limit = Duration::from_secs(self.timeout_seconds);
            // Dropping the wait future drops the child, which kills it.
            match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output?,
                Err(_) => {
                    error!("Command timed out after {}s: {}", self.timeout_seconds, cmd_str);
                    return Err(ToolchainError::Timeout {
                        command: cmd_str,
                        seconds: self.timeout_seconds,
                    });
                }
            }
        } else {
            child.wait_with_output().await?
        };
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        let exit_code = output.status.code().unwrap_or(-1);
        if exit_code == 0 {
            info!("{} completed in {}ms", command.step, duration_ms);
        } else {
            info!(
                "{} exited with code {} after {}ms",
                command.step, exit_code, duration_ms
            );
        }

        Ok(ExecutionResult {
            step: command.step,
            command: cmd_str,
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            started_at,
            finished_at,
            duration_ms,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::ToolStep;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let dir = tempdir().unwrap();
        let runner = ProcessRunner::new(30);
        let cmd = CommandSpec::new(ToolStep::Build, "sh")
            .args(["-c", "echo out; echo err 1>&2; exit 3"]);

        let result = runner.run(&cmd, dir.path()).await.unwrap();

        assert_eq!(result.exit_code, 3);
        assert!(!result.success());
        assert_eq!(result.stdout.trim(), "out");
        assert_eq!(result.stderr.trim(), "err");
        assert_eq!(result.step, ToolStep::Build);
    }

    #[tokio::test]
    async fn test_runs_in_workdir() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let runner = ProcessRunner::default();
        let cmd = CommandSpec::new(ToolStep::Test, "cat").arg("marker.txt");

        let result = runner.run(&cmd, dir.path()).await.unwrap();

        assert!(result.success());
        assert_eq!(result.stdout, "here");
    }

    #[tokio::test]
    async fn test_timeout_kills_command() {
        let dir = tempdir().unwrap();
        let runner = ProcessRunner::new(1);
        let cmd = CommandSpec::new(ToolStep::Build, "sleep").arg("10");

        let result = runner.run(&cmd, dir.path()).await;

        assert!(matches!(result, Err(ToolchainError::Timeout { seconds: 1, .. })));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let dir = tempdir().unwrap();
        let runner = ProcessRunner::default();
        let cmd = CommandSpec::new(ToolStep::Configure, "definitely-not-a-real-program-xyz");

        let result = runner.run(&cmd, dir.path()).await;

        assert!(matches!(result, Err(ToolchainError::Spawn { .. })));
    }
}
