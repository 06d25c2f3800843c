//! Mock command runner for testing.
//!
//! Provides a scripted implementation of the CommandRunner trait so the
//! build-repair loop and the pipeline can be exercised without CMake.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::config::{CommandSpec, ToolStep};
use crate::error::{ToolchainError, ToolchainResult};
use crate::runner::{CommandRunner, ExecutionResult};

/// Predefined mock response for a command execution.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 10,
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 10,
        }
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub step: ToolStep,
    pub command: String,
    pub workdir: PathBuf,
}

/// Mock command runner.
///
/// Responses are looked up per [`ToolStep`]: queued one-shot responses are
/// consumed first, then the step's sticky response, then a plain success.
#[derive(Clone, Default)]
pub struct MockCommandRunner {
    queued: Arc<RwLock<HashMap<ToolStep, VecDeque<MockResponse>>>>,
    sticky: Arc<RwLock<HashMap<ToolStep, MockResponse>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl MockCommandRunner {
    /// Create a mock where every step succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot response for the next call of `step`.
    pub fn push_response(self, step: ToolStep, response: MockResponse) -> Self {
        self.queued
            .write()
            .entry(step)
            .or_default()
            .push_back(response);
        self
    }

    /// Respond to every call of `step` with `response` once its queue is empty.
    pub fn always(self, step: ToolStep, response: MockResponse) -> Self {
        self.sticky.write().insert(step, response);
        self
    }

    /// Make every call fail before producing output (e.g. missing binary).
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the ordered list of steps that were run.
    pub fn steps(&self) -> Vec<ToolStep> {
        self.captured_calls.read().iter().map(|c| c.step).collect()
    }

    /// Number of calls made for a step.
    pub fn call_count(&self, step: ToolStep) -> usize {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.step == step)
            .count()
    }

    /// Check if a step was run.
    pub fn was_called(&self, step: ToolStep) -> bool {
        self.call_count(step) > 0
    }

    fn next_response(&self, step: ToolStep) -> MockResponse {
        if let Some(response) = self
            .queued
            .write()
            .get_mut(&step)
            .and_then(|queue| queue.pop_front())
        {
            return response;
        }
        self.sticky
            .read()
            .get(&step)
            .cloned()
            .unwrap_or_else(|| MockResponse::success(""))
    }
}

#[async_trait]
impl CommandRunner for MockCommandRunner {
    async fn run(&self, command: &CommandSpec, workdir: &Path) -> ToolchainResult<ExecutionResult> {
        self.captured_calls.write().push(CapturedCall {
            step: command.step,
            command: command.to_string(),
            workdir: workdir.to_path_buf(),
        });

        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(ToolchainError::ExecutionFailed(msg));
        }

        let response = self.next_response(command.step);
        let started_at = Utc::now();
        let finished_at = started_at + chrono::Duration::milliseconds(response.duration_ms as i64);

        Ok(ExecutionResult {
            step: command.step,
            command: command.to_string(),
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at,
            finished_at,
            duration_ms: response.duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_to_success() {
        let runner = MockCommandRunner::new();
        let cmd = CommandSpec::new(ToolStep::Build, "cmake");

        let result = runner.run(&cmd, Path::new("build")).await.unwrap();

        assert!(result.success());
        assert_eq!(runner.call_count(ToolStep::Build), 1);
    }

    #[tokio::test]
    async fn test_queue_then_sticky() {
        let runner = MockCommandRunner::new()
            .push_response(ToolStep::Build, MockResponse::failure(2, "first"))
            .always(ToolStep::Build, MockResponse::failure(1, "always"));
        let cmd = CommandSpec::new(ToolStep::Build, "cmake");

        let r1 = runner.run(&cmd, Path::new(".")).await.unwrap();
        let r2 = runner.run(&cmd, Path::new(".")).await.unwrap();
        let r3 = runner.run(&cmd, Path::new(".")).await.unwrap();

        assert_eq!(r1.stderr, "first");
        assert_eq!(r2.stderr, "always");
        assert_eq!(r3.exit_code, 1);
    }

    #[tokio::test]
    async fn test_failure_simulation() {
        let runner = MockCommandRunner::new().simulate_failure("no cmake");
        let cmd = CommandSpec::new(ToolStep::Configure, "cmake");

        let result = runner.run(&cmd, Path::new(".")).await;

        assert!(matches!(result, Err(ToolchainError::ExecutionFailed(msg)) if msg == "no cmake"));
        assert!(runner.was_called(ToolStep::Configure));
    }
}
