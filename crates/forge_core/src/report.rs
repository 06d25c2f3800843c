//! Test execution and coverage reporting.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use forge_toolchain::{
    CommandRunner, ToolStep, ToolchainConfig, COVERAGE_HTML_DIR, COVERAGE_SUMMARY_FILE,
};

/// Result of running the compiled test suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    pub passed: bool,
    /// `None` when the runner could not be started
    pub exit_code: Option<i32>,
    pub output: String,
}

/// Runs the test suite in the build directory.
pub struct TestRunner {
    runner: Arc<dyn CommandRunner>,
    toolchain: ToolchainConfig,
}

impl TestRunner {
    pub fn new(runner: Arc<dyn CommandRunner>, toolchain: ToolchainConfig) -> Self {
        Self { runner, toolchain }
    }

    pub async fn run_tests(&self) -> TestOutcome {
        info!("Running tests");
        match self
            .runner
            .run(&self.toolchain.test(), &self.toolchain.build_dir)
            .await
        {
            Ok(result) => {
                let passed = result.success();
                if passed {
                    info!("All tests passed");
                } else {
                    error!("Tests failed:\n{}", result.combined_output());
                }
                TestOutcome {
                    passed,
                    exit_code: Some(result.exit_code),
                    output: result.combined_output(),
                }
            }
            Err(e) => {
                error!("Failed to run tests: {}", e);
                TestOutcome {
                    passed: false,
                    exit_code: None,
                    output: e.to_string(),
                }
            }
        }
    }
}

/// Coverage run summary. Failures are recorded, never raised.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageReport {
    pub failed_steps: Vec<ToolStep>,
    pub summary: Option<String>,
    pub summary_path: Option<PathBuf>,
    pub html_dir: Option<PathBuf>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.failed_steps.is_empty() && self.summary_path.is_some()
    }
}

/// Captures, filters and renders coverage data.
pub struct CoverageReporter {
    runner: Arc<dyn CommandRunner>,
    toolchain: ToolchainConfig,
}

impl CoverageReporter {
    pub fn new(runner: Arc<dyn CommandRunner>, toolchain: ToolchainConfig) -> Self {
        Self { runner, toolchain }
    }

    pub async fn generate(&self) -> CoverageReport {
        info!("Generating coverage report");
        let build_dir = &self.toolchain.build_dir;
        let mut report = CoverageReport::default();

        for command in self.toolchain.coverage_steps() {
            match self.runner.run(&command, build_dir).await {
                Ok(result) if result.success() => {}
                Ok(result) => {
                    warn!("Coverage step {} failed:\n{}", command.step, result.stderr);
                    report.failed_steps.push(command.step);
                }
                Err(e) => {
                    warn!("Coverage step {} failed: {}", command.step, e);
                    report.failed_steps.push(command.step);
                }
            }
        }
        if !report.failed_steps.contains(&ToolStep::CoverageRender) {
            report.html_dir = Some(build_dir.join(COVERAGE_HTML_DIR));
        }

        let summary_command = self.toolchain.coverage_summary();
        match self.runner.run(&summary_command, build_dir).await {
            Ok(result) if result.success() => {
                let path = build_dir.join(COVERAGE_SUMMARY_FILE);
                match fs::write(&path, &result.stdout) {
                    Ok(()) => {
                        info!("Coverage summary written to {:?}", path);
                        report.summary_path = Some(path);
                    }
                    Err(e) => warn!("Failed to write coverage summary {:?}: {}", path, e),
                }
                report.summary = Some(result.stdout);
            }
            Ok(result) => {
                warn!("Coverage summary failed:\n{}", result.stderr);
                report.failed_steps.push(ToolStep::CoverageSummary);
            }
            Err(e) => {
                warn!("Coverage summary failed: {}", e);
                report.failed_steps.push(ToolStep::CoverageSummary);
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_toolchain::{MockCommandRunner, MockResponse};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_run_tests_reports_failure() {
        let runner = MockCommandRunner::new()
            .push_response(ToolStep::Test, MockResponse::failure(8, "1 test failed"));

        let outcome = TestRunner::new(Arc::new(runner.clone()), ToolchainConfig::new("build"))
            .run_tests()
            .await;

        assert!(!outcome.passed);
        assert_eq!(outcome.exit_code, Some(8));
        assert_eq!(outcome.output, "1 test failed");
        assert_eq!(runner.get_calls()[0].command, "ctest --output-on-failure --parallel");
    }

    #[tokio::test]
    async fn test_coverage_writes_summary() {
        let temp = tempdir().unwrap();
        let runner = MockCommandRunner::new().push_response(
            ToolStep::CoverageSummary,
            MockResponse::success("lines......: 81.2% (130 of 160 lines)\n"),
        );

        let report = CoverageReporter::new(Arc::new(runner.clone()), ToolchainConfig::new(temp.path()))
            .generate()
            .await;

        assert!(report.is_complete());
        assert_eq!(
            runner.steps(),
            vec![
                ToolStep::CoverageCapture,
                ToolStep::CoverageFilter,
                ToolStep::CoverageRender,
                ToolStep::CoverageSummary
            ]
        );
        assert_eq!(
            fs::read_to_string(temp.path().join(COVERAGE_SUMMARY_FILE)).unwrap(),
            "lines......: 81.2% (130 of 160 lines)\n"
        );
        assert_eq!(report.html_dir, Some(temp.path().join(COVERAGE_HTML_DIR)));
    }

    #[tokio::test]
    async fn test_coverage_failures_are_recorded() {
        let temp = tempdir().unwrap();
        let runner = MockCommandRunner::new()
            .push_response(ToolStep::CoverageCapture, MockResponse::failure(1, "no .gcda files"))
            .push_response(ToolStep::CoverageSummary, MockResponse::failure(1, "cannot read"));

        let report = CoverageReporter::new(Arc::new(runner.clone()), ToolchainConfig::new(temp.path()))
            .generate()
            .await;

        assert_eq!(
            report.failed_steps,
            vec![ToolStep::CoverageCapture, ToolStep::CoverageSummary]
        );
        assert!(report.summary_path.is_none());
        assert!(!temp.path().join(COVERAGE_SUMMARY_FILE).exists());
        // Later steps still ran
        assert_eq!(runner.call_count(ToolStep::CoverageRender), 1);
    }
}
