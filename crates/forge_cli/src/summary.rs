//! Final run summary.

use std::fmt;

use forge_core::{PipelineRun, RepairOutcome};

pub fn render_json(run: &PipelineRun) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(run)?)
}

pub fn render_text(run: &PipelineRun) -> String {
    TextSummary(run).to_string()
}

/// Human-readable run summary.
pub struct TextSummary<'a>(pub &'a PipelineRun);

impl fmt::Display for TextSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let run = self.0;
        let elapsed = run.finished_at - run.started_at;

        writeln!(f, "Run {} ({}s)", run.run_id, elapsed.num_seconds())?;
        writeln!(f, "  Generated: {} test file(s)", run.generated.len())?;
        for path in &run.generated {
            writeln!(f, "    {}", path.display())?;
        }
        writeln!(f, "  Refined:   {} test file(s)", run.refined.len())?;

        if !run.skipped.is_empty() {
            writeln!(f, "  Skipped:   {}", run.skipped.len())?;
            for skipped in &run.skipped {
                writeln!(
                    f,
                    "    {} [{:?}]: {}",
                    skipped.path.display(),
                    skipped.stage,
                    skipped.reason
                )?;
            }
        }

        match &run.build {
            None => writeln!(f, "  Build:     skipped")?,
            Some(build) => {
                let status = match &build.outcome {
                    RepairOutcome::Success => "succeeded".to_string(),
                    RepairOutcome::Fail(reason) => format!("failed ({})", reason),
                };
                writeln!(
                    f,
                    "  Build:     {} after {} build(s), {} repair attempt(s)",
                    status, build.builds, build.attempts
                )?;
            }
        }

        if let Some(tests) = &run.tests {
            let status = if tests.passed { "passed" } else { "failed" };
            writeln!(f, "  Tests:     {}", status)?;
        }

        if let Some(coverage) = &run.coverage {
            match &coverage.summary_path {
                Some(path) => writeln!(f, "  Coverage:  {}", path.display())?,
                None => writeln!(f, "  Coverage:  incomplete")?,
            }
            if let Some(summary) = &coverage.summary {
                for line in summary.lines().filter(|l| !l.trim().is_empty()) {
                    writeln!(f, "    {}", line.trim())?;
                }
            }
        }

        Ok(())
    }
}
