//! Single-pass refinement of generated tests.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use forge_llm::CompletionClient;

use crate::error::CoreResult;
use crate::outcome::{SkipReason, Stage, StageReport};
use crate::prompt::PromptBuilder;

/// `<path>.backup`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".backup");
    PathBuf::from(name)
}

/// Asks the model to improve each test file once.
pub struct RefinementStage {
    prompts: PromptBuilder,
    llm: Arc<dyn CompletionClient>,
}

impl RefinementStage {
    pub fn new(prompts: PromptBuilder, llm: Arc<dyn CompletionClient>) -> Self {
        Self { prompts, llm }
    }

    /// Refine one file in place.
    ///
    /// Returns `Ok(false)` when the model produced nothing; the file is then
    /// untouched. On success the previous content is kept at [`backup_path`].
    pub async fn refine(&self, path: &Path) -> CoreResult<bool> {
        let current = fs::read_to_string(path)?;
        let prompt = self.prompts.refinement(path, &current);

        let Some(refined) = self.llm.complete(&prompt).await else {
            return Ok(false);
        };

        fs::write(backup_path(path), &current)?;
        fs::write(path, refined)?;
        Ok(true)
    }

    /// Refine every file, skipping failures.
    pub async fn refine_all(&self, paths: &[PathBuf], cancel: &CancellationToken) -> StageReport {
        let mut report = StageReport::default();

        for path in paths {
            if cancel.is_cancelled() {
                report.skip(path, Stage::Refine, SkipReason::Cancelled);
                continue;
            }

            info!("Refining {:?}", path);
            match self.refine(path).await {
                Ok(true) => report.produced.push(path.clone()),
                Ok(false) => {
                    warn!("Refinement of {:?} returned nothing; keeping original", path);
                    report.skip(path, Stage::Refine, SkipReason::EmptyCompletion);
                }
                Err(e) => {
                    warn!("Failed to refine {:?}: {}", path, e);
                    report.skip(path, Stage::Refine, SkipReason::WriteFailed(e.to_string()));
                }
            }
        }

        report
    }
}
