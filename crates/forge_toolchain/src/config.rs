//! Toolchain command presets.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Raw lcov capture output, relative to the build directory.
pub const COVERAGE_INFO: &str = "coverage.info";
/// Coverage data with system paths removed.
pub const COVERAGE_FILTERED_INFO: &str = "coverage.filtered.info";
/// HTML report directory.
pub const COVERAGE_HTML_DIR: &str = "coverage-html";
/// Text summary written after a successful coverage run.
pub const COVERAGE_SUMMARY_FILE: &str = "coverage.txt";

/// A single step of the toolchain pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStep {
    Configure,
    Build,
    Test,
    CoverageCapture,
    CoverageFilter,
    CoverageRender,
    CoverageSummary,
}

impl ToolStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::Build => "build",
            Self::Test => "test",
            Self::CoverageCapture => "coverage_capture",
            Self::CoverageFilter => "coverage_filter",
            Self::CoverageRender => "coverage_render",
            Self::CoverageSummary => "coverage_summary",
        }
    }
}

impl fmt::Display for ToolStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A program invocation tagged with the step it performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub step: ToolStep,
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(step: ToolStep, program: impl Into<String>) -> Self {
        Self {
            step,
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    /// Shell-like rendering used for logging.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(' ') || arg.contains('*') {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Toolchain configuration: where to build and which programs to call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Directory all commands run in (created on demand)
    pub build_dir: PathBuf,
    /// Project root handed to the configure step, relative to `build_dir`
    /// unless absolute
    pub project_dir: PathBuf,
    /// Per-command timeout in seconds (0 = no timeout)
    pub timeout_seconds: u64,
    pub cmake: String,
    pub ctest: String,
    pub lcov: String,
    pub genhtml: String,
}

impl ToolchainConfig {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            project_dir: PathBuf::from(".."),
            timeout_seconds: 600, // 10 minutes
            cmake: "cmake".to_string(),
            ctest: "ctest".to_string(),
            lcov: "lcov".to_string(),
            genhtml: "genhtml".to_string(),
        }
    }

    pub fn project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = dir.into();
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Configure with coverage instrumentation, tests enabled, debug build.
    pub fn configure(&self) -> CommandSpec {
        CommandSpec::new(ToolStep::Configure, &self.cmake).args([
            self.project_dir.to_string_lossy().into_owned(),
            "-DENABLE_COVERAGE=ON".to_string(),
            "-DBUILD_TESTING=ON".to_string(),
            "-DCMAKE_BUILD_TYPE=Debug".to_string(),
        ])
    }

    pub fn build(&self) -> CommandSpec {
        CommandSpec::new(ToolStep::Build, &self.cmake).args(["--build", ".", "--parallel"])
    }

    pub fn test(&self) -> CommandSpec {
        CommandSpec::new(ToolStep::Test, &self.ctest).args(["--output-on-failure", "--parallel"])
    }

    /// Capture, filter and render steps, in execution order.
    pub fn coverage_steps(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new(ToolStep::CoverageCapture, &self.lcov).args([
                "--capture",
                "--directory",
                ".",
                "--output-file",
                COVERAGE_INFO,
            ]),
            CommandSpec::new(ToolStep::CoverageFilter, &self.lcov).args([
                "--remove",
                COVERAGE_INFO,
                "/usr/*",
                "--output-file",
                COVERAGE_FILTERED_INFO,
            ]),
            CommandSpec::new(ToolStep::CoverageRender, &self.genhtml).args([
                COVERAGE_FILTERED_INFO,
                "--output-directory",
                COVERAGE_HTML_DIR,
            ]),
        ]
    }

    pub fn coverage_summary(&self) -> CommandSpec {
        CommandSpec::new(ToolStep::CoverageSummary, &self.lcov)
            .args(["--summary", COVERAGE_FILTERED_INFO])
    }
}
