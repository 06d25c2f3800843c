//! End-to-end pipeline driver.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use forge_config::RuleSet;
use forge_llm::{CompletionClient, DEFAULT_MAX_TOKENS};
use forge_toolchain::{CommandRunner, ToolchainConfig};

use crate::discovery::discover_sources;
use crate::error::{CoreError, CoreResult};
use crate::generate::GenerationStage;
use crate::lock::RunLock;
use crate::materializer::{TestMaterializer, DEFAULT_TEST_EXTENSION};
use crate::outcome::SkippedArtifact;
use crate::prompt::PromptBuilder;
use crate::refine::RefinementStage;
use crate::repair::{BuildRepairLoop, RepairPolicy, RepairReport};
use crate::report::{CoverageReport, CoverageReporter, TestOutcome, TestRunner};

/// Run settings that are not part of the prompt rules.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub test_dir: PathBuf,
    pub skip_build: bool,
    pub skip_coverage: bool,
    pub test_extension: String,
    pub repair: RepairPolicy,
    pub max_tokens: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            test_dir: PathBuf::from("tests"),
            skip_build: false,
            skip_coverage: false,
            test_extension: DEFAULT_TEST_EXTENSION.to_string(),
            repair: RepairPolicy::default(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Test files written by generation, in source order
    pub generated: Vec<PathBuf>,
    /// Test files successfully rewritten by refinement
    pub refined: Vec<PathBuf>,
    pub skipped: Vec<SkippedArtifact>,
    /// `None` when the build was skipped
    pub build: Option<RepairReport>,
    /// `None` unless the build succeeded
    pub tests: Option<TestOutcome>,
    /// `None` unless the tests passed and coverage was requested
    pub coverage: Option<CoverageReport>,
}

impl PipelineRun {
    pub fn build_succeeded(&self) -> bool {
        self.build.as_ref().is_some_and(RepairReport::succeeded)
    }

    pub fn tests_passed(&self) -> bool {
        self.tests.as_ref().is_some_and(|t| t.passed)
    }
}

/// Wires the stages together for one run.
pub struct PipelineDriver {
    rules: Arc<RuleSet>,
    llm: Arc<dyn CompletionClient>,
    runner: Arc<dyn CommandRunner>,
    toolchain: ToolchainConfig,
    options: PipelineOptions,
    cancel: CancellationToken,
}

impl PipelineDriver {
    pub fn new(
        rules: Arc<RuleSet>,
        llm: Arc<dyn CompletionClient>,
        runner: Arc<dyn CommandRunner>,
        toolchain: ToolchainConfig,
    ) -> Self {
        Self {
            rules,
            llm,
            runner,
            toolchain,
            options: PipelineOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Discover sources under `root` and run the pipeline on them.
    pub async fn run_path(&self, root: &Path) -> CoreResult<PipelineRun> {
        let sources = discover_sources(root)?;
        if sources.is_empty() {
            return Err(CoreError::NoSourceFiles(root.to_path_buf()));
        }
        info!("Found {} source file(s) under {:?}", sources.len(), root);
        self.run(&sources).await
    }

    /// Generate, refine, build with repair, test, and report coverage.
    pub async fn run(&self, sources: &[PathBuf]) -> CoreResult<PipelineRun> {
        let test_dir = &self.options.test_dir;
        let _lock = RunLock::acquire(test_dir)?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("Starting run {} for {} source file(s)", run_id, sources.len());

        let prompts = PromptBuilder::new(self.rules.clone()).with_max_tokens(self.options.max_tokens);
        let materializer =
            TestMaterializer::new(test_dir).with_extension(self.options.test_extension.clone());

        let generation = GenerationStage::new(prompts.clone(), self.llm.clone(), materializer)
            .generate_all(sources, &self.cancel)
            .await;
        if generation.produced.is_empty() {
            return Err(CoreError::NoTestsGenerated);
        }
        info!("Generated {} test file(s)", generation.produced.len());

        let refinement = RefinementStage::new(prompts.clone(), self.llm.clone())
            .refine_all(&generation.produced, &self.cancel)
            .await;
        info!(
            "Refined {} of {} test file(s)",
            refinement.produced.len(),
            generation.produced.len()
        );

        let mut skipped = generation.skipped;
        skipped.extend(refinement.skipped);

        let mut run = PipelineRun {
            run_id,
            started_at,
            finished_at: started_at,
            generated: generation.produced,
            refined: refinement.produced,
            skipped,
            build: None,
            tests: None,
            coverage: None,
        };

        if self.options.skip_build {
            info!("Skipping build");
        } else {
            fs::create_dir_all(&self.toolchain.build_dir)?;
            let report = BuildRepairLoop::new(
                self.runner.clone(),
                self.toolchain.clone(),
                prompts,
                self.llm.clone(),
                test_dir,
            )
            .with_policy(self.options.repair)
            .with_test_extension(self.options.test_extension.clone())
            .run(&self.cancel)
            .await;
            run.build = Some(report);

            if run.build_succeeded() && !self.cancel.is_cancelled() {
                let tests = TestRunner::new(self.runner.clone(), self.toolchain.clone())
                    .run_tests()
                    .await;
                run.tests = Some(tests);

                if !run.tests_passed() {
                    warn!("Skipping coverage: tests did not pass");
                } else if self.options.skip_coverage {
                    info!("Skipping coverage");
                } else {
                    let coverage = CoverageReporter::new(self.runner.clone(), self.toolchain.clone())
                        .generate()
                        .await;
                    run.coverage = Some(coverage);
                }
            }
        }

        run.finished_at = Utc::now();
        info!("Run {} finished", run_id);
        Ok(run)
    }
}
