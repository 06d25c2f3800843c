//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use forge_core::{PipelineOptions, RepairPolicy, DEFAULT_MAX_ATTEMPTS};
use forge_llm::OllamaConfig;
use forge_toolchain::ToolchainConfig;

/// Final summary format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// testforge - LLM-driven unit test generation for C++ projects
#[derive(Parser, Debug)]
#[command(name = "testforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source file or directory to generate tests for
    #[arg(value_name = "SOURCE_PATH")]
    pub source_path: PathBuf,

    /// Directory generated tests are written to
    #[arg(long, default_value = "tests")]
    pub test_dir: PathBuf,

    /// Directory the project is configured and built in
    #[arg(long, default_value = "build")]
    pub build_dir: PathBuf,

    /// Stop after generation and refinement
    #[arg(long)]
    pub skip_build: bool,

    /// Do not generate a coverage report
    #[arg(long)]
    pub skip_coverage: bool,

    /// Directory containing the prompt rule documents
    #[arg(long, default_value = ".", env = "TESTFORGE_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Project root passed to CMake, relative to the build directory
    #[arg(long, default_value = "..")]
    pub project_dir: PathBuf,

    /// Completion endpoint URL
    #[arg(long, env = "TESTFORGE_LLM_URL")]
    pub llm_url: Option<String>,

    /// Model name sent with each completion request
    #[arg(long, env = "TESTFORGE_LLM_MODEL")]
    pub model: Option<String>,

    /// Build-fix attempts before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_repair_attempts: u32,

    /// Timeout for each toolchain command (0 = none)
    #[arg(long, default_value_t = 600)]
    pub command_timeout_secs: u64,

    /// Total time allowed for the build-repair loop (0 = unbounded)
    #[arg(long, default_value_t = 1800)]
    pub repair_budget_secs: u64,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Format of the final summary
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl Cli {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            test_dir: self.test_dir.clone(),
            skip_build: self.skip_build,
            skip_coverage: self.skip_coverage,
            repair: RepairPolicy {
                max_attempts: self.max_repair_attempts,
                budget: (self.repair_budget_secs > 0)
                    .then(|| Duration::from_secs(self.repair_budget_secs)),
            },
            ..PipelineOptions::default()
        }
    }

    pub fn toolchain(&self) -> ToolchainConfig {
        ToolchainConfig::new(&self.build_dir)
            .project_dir(&self.project_dir)
            .timeout(self.command_timeout_secs)
    }

    /// Apply endpoint and model overrides on top of `base`.
    pub fn llm_config(&self, base: OllamaConfig) -> OllamaConfig {
        let mut config = base;
        if let Some(url) = &self.llm_url {
            config = config.endpoint(url);
        }
        if let Some(model) = &self.model {
            config = config.model(model);
        }
        config
    }
}
