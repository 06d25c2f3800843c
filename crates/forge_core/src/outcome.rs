//! Per-artifact stage results.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use forge_config::Category;

/// Pipeline stage an artifact was dropped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Generate,
    Refine,
}

/// Why an artifact was dropped from a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    Unreadable(String),
    NoRule(Category),
    EmptyCompletion,
    WriteFailed(String),
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(e) => write!(f, "unreadable: {}", e),
            Self::NoRule(category) => write!(f, "no rules for category {}", category),
            Self::EmptyCompletion => write!(f, "empty completion"),
            Self::WriteFailed(e) => write!(f, "write failed: {}", e),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedArtifact {
    pub path: PathBuf,
    pub stage: Stage,
    pub reason: SkipReason,
}

/// Paths a stage produced, in input order, plus what it dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub produced: Vec<PathBuf>,
    pub skipped: Vec<SkippedArtifact>,
}

impl StageReport {
    pub(crate) fn skip(&mut self, path: impl Into<PathBuf>, stage: Stage, reason: SkipReason) {
        self.skipped.push(SkippedArtifact {
            path: path.into(),
            stage,
            reason,
        });
    }
}
