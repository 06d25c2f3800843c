//! Build-repair loop.
//!
//! An iterative state machine:
//!
//! ```text
//! Configure ──ok──▶ Build ──ok──▶ Success
//!     │               │
//!   fail            fail ──(attempts == max)──▶ Fail
//!     ▼               ▼
//!    Fail         Diagnose ──▶ Fix ──(no suggestion)──▶ Fail
//!                               │
//!                               └──(patched, attempts += 1)──▶ Configure
//! ```
//!
//! Every non-terminal transition first checks the cancellation token and the
//! wall-clock budget. Toolchain commands are also cut off when the budget
//! runs out mid-command.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use forge_llm::CompletionClient;
use forge_toolchain::{CommandRunner, CommandSpec, ExecutionResult, ToolchainConfig};

use crate::fixes::apply_required_includes;
use crate::materializer::DEFAULT_TEST_EXTENSION;
use crate::prompt::PromptBuilder;

/// Lines of compiler output handed to the model.
pub const DIAGNOSTIC_WINDOW_LINES: usize = 50;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_REPAIR_BUDGET: Duration = Duration::from_secs(30 * 60);

/// Bounds on the repair loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairPolicy {
    /// Fix attempts before giving up
    pub max_attempts: u32,
    /// Total wall-clock time for the loop (`None` = unbounded)
    pub budget: Option<Duration>,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            budget: Some(DEFAULT_REPAIR_BUDGET),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepairState {
    Configure,
    Build,
    Diagnose,
    Fix,
    Success,
    Fail,
}

impl RepairState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Fail)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailReason {
    ConfigureFailed { exit_code: i32 },
    RetriesExhausted,
    NoSuggestion,
    BudgetExceeded,
    Cancelled,
    Toolchain { message: String },
    FixFailed { message: String },
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigureFailed { exit_code } => {
                write!(f, "configure failed with exit code {}", exit_code)
            }
            Self::RetriesExhausted => write!(f, "build still failing after all repair attempts"),
            Self::NoSuggestion => write!(f, "model returned no fix suggestion"),
            Self::BudgetExceeded => write!(f, "repair time budget exceeded"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Toolchain { message } => write!(f, "toolchain error: {}", message),
            Self::FixFailed { message } => write!(f, "applying fix failed: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RepairOutcome {
    Success,
    Fail(FailReason),
}

/// What a repair loop run did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairReport {
    pub outcome: RepairOutcome,
    /// Fixes applied
    pub attempts: u32,
    /// Build invocations
    pub builds: u32,
    /// Files rewritten across all fixes
    pub patched_files: usize,
    /// Visited states, terminal state last
    pub trace: Vec<RepairState>,
    pub last_diagnostic: Option<String>,
}

impl RepairReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == RepairOutcome::Success
    }
}

/// Last [`DIAGNOSTIC_WINDOW_LINES`] lines of a failed build's stderr, or of
/// stdout when stderr is empty.
pub fn diagnostic_window(result: &ExecutionResult) -> String {
    let output = if result.stderr.trim().is_empty() {
        &result.stdout
    } else {
        &result.stderr
    };

    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(DIAGNOSTIC_WINDOW_LINES);
    lines[start..].join("\n")
}

/// Drives configure/build and feeds failures back to the model.
pub struct BuildRepairLoop {
    runner: Arc<dyn CommandRunner>,
    toolchain: ToolchainConfig,
    prompts: PromptBuilder,
    llm: Arc<dyn CompletionClient>,
    test_dir: PathBuf,
    test_extension: String,
    policy: RepairPolicy,
}

impl BuildRepairLoop {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        toolchain: ToolchainConfig,
        prompts: PromptBuilder,
        llm: Arc<dyn CompletionClient>,
        test_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            toolchain,
            prompts,
            llm,
            test_dir: test_dir.into(),
            test_extension: DEFAULT_TEST_EXTENSION.to_string(),
            policy: RepairPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RepairPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_test_extension(mut self, extension: impl Into<String>) -> Self {
        self.test_extension = extension.into();
        self
    }

    /// Run until `Success` or `Fail`.
    pub async fn run(&self, cancel: &CancellationToken) -> RepairReport {
        let started = Instant::now();
        let mut report = RepairReport {
            outcome: RepairOutcome::Success,
            attempts: 0,
            builds: 0,
            patched_files: 0,
            trace: Vec::new(),
            last_diagnostic: None,
        };
        let mut state = RepairState::Configure;
        let mut failure: Option<FailReason> = None;
        let mut failed_build: Option<ExecutionResult> = None;

        loop {
            if !state.is_terminal() {
                if cancel.is_cancelled() {
                    failure = Some(FailReason::Cancelled);
                    state = RepairState::Fail;
                } else if self.policy.budget.is_some_and(|b| started.elapsed() >= b) {
                    failure = Some(FailReason::BudgetExceeded);
                    state = RepairState::Fail;
                }
            }
            report.trace.push(state);
            debug!("Repair loop state: {:?}", state);

            state = match state {
                RepairState::Configure => {
                    info!("Configuring build in {:?}", self.toolchain.build_dir);
                    match self.execute(&self.toolchain.configure(), started).await {
                        Ok(result) if result.success() => RepairState::Build,
                        Ok(result) => {
                            error!("Configure failed:\n{}", diagnostic_window(&result));
                            failure = Some(FailReason::ConfigureFailed {
                                exit_code: result.exit_code,
                            });
                            RepairState::Fail
                        }
                        Err(reason) => {
                            failure = Some(reason);
                            RepairState::Fail
                        }
                    }
                }
                RepairState::Build => {
                    report.builds += 1;
                    info!("Building (attempt {})", report.attempts + 1);
                    match self.execute(&self.toolchain.build(), started).await {
                        Ok(result) if result.success() => RepairState::Success,
                        Ok(result) => {
                            warn!("Build failed with exit code {}", result.exit_code);
                            failed_build = Some(result);
                            if report.attempts >= self.policy.max_attempts {
                                failure = Some(FailReason::RetriesExhausted);
                                RepairState::Fail
                            } else {
                                RepairState::Diagnose
                            }
                        }
                        Err(reason) => {
                            failure = Some(reason);
                            RepairState::Fail
                        }
                    }
                }
                RepairState::Diagnose => {
                    report.last_diagnostic = failed_build.as_ref().map(diagnostic_window);
                    RepairState::Fix
                }
                RepairState::Fix => {
                    let window = report.last_diagnostic.clone().unwrap_or_default();
                    let prompt = self.prompts.repair(&window, &self.test_dir);

                    match self.llm.complete(&prompt).await {
                        None => {
                            failure = Some(FailReason::NoSuggestion);
                            RepairState::Fail
                        }
                        Some(suggestion) => {
                            info!("Suggested fix:\n{}", suggestion);
                            match apply_required_includes(
                                &self.test_dir,
                                &self.test_extension,
                                &self.prompts.rules().required_includes,
                            ) {
                                Ok(patched) => {
                                    info!("Patched {} test file(s)", patched);
                                    report.patched_files += patched;
                                    report.attempts += 1;
                                    RepairState::Configure
                                }
                                Err(e) => {
                                    failure = Some(FailReason::FixFailed {
                                        message: e.to_string(),
                                    });
                                    RepairState::Fail
                                }
                            }
                        }
                    }
                }
                RepairState::Success => {
                    info!("Build succeeded after {} repair attempt(s)", report.attempts);
                    break;
                }
                RepairState::Fail => {
                    let reason = failure.take().unwrap_or(FailReason::RetriesExhausted);
                    error!("Build failed: {}", reason);
                    report.outcome = RepairOutcome::Fail(reason);
                    break;
                }
            };
        }

        report
    }

    async fn execute(&self, command: &CommandSpec, started: Instant) -> Result<ExecutionResult, FailReason> {
        let run = self.runner.run(command, &self.toolchain.build_dir);
        let result = match self.policy.budget {
            Some(budget) => {
                let remaining = budget.saturating_sub(started.elapsed());
                match tokio::time::timeout(remaining, run).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("{} cut off by the repair time budget", command.step);
                        return Err(FailReason::BudgetExceeded);
                    }
                }
            }
            None => run.await,
        };

        result.map_err(|e| FailReason::Toolchain {
            message: e.to_string(),
        })
    }
}
