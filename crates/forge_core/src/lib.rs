//! # forge_core
//!
//! Test generation and build-repair pipeline for testforge.
//!
//! A run walks a C++ source tree and, per source file, asks a language
//! model for a GoogleTest file, then asks it once more to refine the result.
//! The generated tests are built with CMake; compiler errors are fed back
//! to the model and a blunt include fix is applied until the build passes
//! or the repair bounds are hit. Passing builds are tested and reported
//! with lcov coverage.
//!
//! # Architecture
//!
//! - **Inspector**: lexical extraction of classes, functions and includes
//! - **Prompts**: `{slot}` templates from the loaded [`forge_config::RuleSet`]
//! - **Stages**: generation and refinement, which skip failing artifacts
//! - **Repair loop**: configure/build/diagnose/fix state machine
//! - **Driver**: wires the stages together behind a run lock
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use forge_config::ConfigLoader;
//! use forge_core::{PipelineDriver, PipelineOptions};
//! use forge_llm::{OllamaClient, OllamaConfig};
//! use forge_toolchain::{ProcessRunner, ToolchainConfig};
//!
//! let rules = Arc::new(ConfigLoader::new(".").load()?);
//! let toolchain = ToolchainConfig::new("build");
//! let driver = PipelineDriver::new(
//!     rules,
//!     Arc::new(OllamaClient::new(OllamaConfig::default())?),
//!     Arc::new(ProcessRunner::new(toolchain.timeout_seconds)),
//!     toolchain,
//! )
//! .with_options(PipelineOptions::default());
//!
//! let run = driver.run_path("src".as_ref()).await?;
//! println!("generated {} tests", run.generated.len());
//! ```

pub mod discovery;
pub mod error;
pub mod fixes;
pub mod generate;
pub mod inspector;
pub mod lock;
pub mod materializer;
pub mod outcome;
pub mod pipeline;
pub mod prompt;
pub mod refine;
pub mod repair;
pub mod report;

pub use discovery::{discover_sources, SOURCE_EXTENSIONS};
pub use error::{CoreError, CoreResult};
pub use fixes::apply_required_includes;
pub use generate::GenerationStage;
pub use inspector::{classify, ArtifactInspector, SourceArtifact};
pub use lock::{RunLock, LOCK_FILE};
pub use materializer::{TestMaterializer, DEFAULT_TEST_EXTENSION, TEST_SUFFIX};
pub use outcome::{SkipReason, SkippedArtifact, Stage, StageReport};
pub use pipeline::{PipelineDriver, PipelineOptions, PipelineRun};
pub use prompt::{PromptBuilder, PromptRenderer, RenderedPrompt, MAX_PROMPT_FUNCTIONS};
pub use refine::{backup_path, RefinementStage};
pub use repair::{
    diagnostic_window, BuildRepairLoop, FailReason, RepairOutcome, RepairPolicy, RepairReport,
    RepairState, DEFAULT_MAX_ATTEMPTS, DEFAULT_REPAIR_BUDGET, DIAGNOSTIC_WINDOW_LINES,
};
pub use report::{CoverageReport, CoverageReporter, TestOutcome, TestRunner};
