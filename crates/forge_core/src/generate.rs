//! Initial test generation: inspect → prompt → complete → materialize.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use forge_llm::CompletionClient;

use crate::inspector::ArtifactInspector;
use crate::materializer::TestMaterializer;
use crate::outcome::{SkipReason, Stage, StageReport};
use crate::prompt::PromptBuilder;

/// Generates one test file per source file.
pub struct GenerationStage {
    inspector: ArtifactInspector,
    prompts: PromptBuilder,
    llm: Arc<dyn CompletionClient>,
    materializer: TestMaterializer,
}

impl GenerationStage {
    pub fn new(
        prompts: PromptBuilder,
        llm: Arc<dyn CompletionClient>,
        materializer: TestMaterializer,
    ) -> Self {
        Self {
            inspector: ArtifactInspector::new(),
            prompts,
            llm,
            materializer,
        }
    }

    /// Generate a test for a single source file.
    pub async fn generate_one(&self, source: &Path) -> Result<PathBuf, SkipReason> {
        info!("Analyzing {:?}", source);
        let artifact = self
            .inspector
            .inspect(source)
            .map_err(|e| SkipReason::Unreadable(e.to_string()))?;

        let Some(prompt) = self.prompts.generation(&artifact) else {
            return Err(SkipReason::NoRule(artifact.category));
        };

        info!("Generating tests for {:?}", source);
        let completion = self.llm.complete(&prompt).await;

        match self.materializer.materialize(source, completion.as_deref()) {
            Ok(Some(path)) => Ok(path),
            Ok(None) => Err(SkipReason::EmptyCompletion),
            Err(e) => Err(SkipReason::WriteFailed(e.to_string())),
        }
    }

    /// Generate tests for every source, skipping failures.
    pub async fn generate_all(&self, sources: &[PathBuf], cancel: &CancellationToken) -> StageReport {
        let mut report = StageReport::default();

        for source in sources {
            if cancel.is_cancelled() {
                report.skip(source, Stage::Generate, SkipReason::Cancelled);
                continue;
            }

            match self.generate_one(source).await {
                Ok(path) => {
                    if report.produced.contains(&path) {
                        warn!("{:?} overwrote a test generated earlier in this run", path);
                    } else {
                        report.produced.push(path.clone());
                    }
                    info!("Generated {:?}", path);
                }
                Err(reason) => {
                    match &reason {
                        SkipReason::NoRule(category) => {
                            warn!("No rules found for file type: {}", category)
                        }
                        other => warn!("Failed to generate tests for {:?}: {}", source, other),
                    }
                    report.skip(source, Stage::Generate, reason);
                }
            }
        }

        report
    }
}
