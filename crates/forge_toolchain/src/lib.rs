//! # forge_toolchain
//!
//! Native build toolchain execution for testforge.
//!
//! Every configure, build, test and coverage step is a subprocess run with
//! the build directory as its working directory. Output is captured, never
//! streamed to the console.
//!
//! # Features
//!
//! - **Command Presets**: CMake configure/build, CTest, lcov/genhtml coverage
//! - **Timeouts**: Every subprocess is bounded and killed when it overruns
//! - **Mock Runner**: Scripted per-step responses for tests without a toolchain
//!
//! # Example
//!
//! ```rust,no_run
//! use forge_toolchain::{CommandRunner, ProcessRunner, ToolchainConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ToolchainConfig::new("build");
//!     let runner = ProcessRunner::new(config.timeout_seconds);
//!
//!     let result = runner.run(&config.configure(), &config.build_dir).await?;
//!     println!("Exit code: {}", result.exit_code);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mock;
pub mod process;
pub mod runner;

pub use config::{
    CommandSpec, ToolStep, ToolchainConfig, COVERAGE_FILTERED_INFO, COVERAGE_HTML_DIR, COVERAGE_INFO,
    COVERAGE_SUMMARY_FILE,
};
pub use error::{ToolchainError, ToolchainResult};
pub use mock::{CapturedCall, MockCommandRunner, MockResponse};
pub use process::ProcessRunner;
pub use runner::{CommandRunner, ExecutionResult};
