//! Command runner trait and types.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{CommandSpec, ToolStep};
use crate::error::ToolchainResult;

/// Result of a single command execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Step the command performed
    pub step: ToolStep,
    /// Rendered command line
    pub command: String,
    /// Exit code (-1 when terminated by a signal)
    pub exit_code: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Execution start time
    pub started_at: DateTime<Utc>,
    /// Execution end time
    pub finished_at: DateTime<Utc>,
    /// Wall-clock time
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Zero exit code.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout then stderr, skipping whichever is empty.
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs toolchain commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` with `workdir` as the working directory and capture its output.
    async fn run(&self, command: &CommandSpec, workdir: &Path) -> ToolchainResult<ExecutionResult>;
}
