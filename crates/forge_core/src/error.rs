//! Error types for the pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that abort a whole run, or a single artifact when returned from
/// a per-artifact operation.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("No source files found under {0:?}")]
    NoSourceFiles(PathBuf),

    #[error("No tests generated")]
    NoTestsGenerated,

    #[error("Test directory is locked by another run: {0:?}")]
    LockHeld(PathBuf),

    #[error("Invalid file pattern: {0}")]
    Pattern(String),

    #[error("Config error: {0}")]
    Config(#[from] forge_config::ConfigError),

    #[error("Toolchain error: {0}")]
    Toolchain(#[from] forge_toolchain::ToolchainError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<glob::PatternError> for CoreError {
    fn from(err: glob::PatternError) -> Self {
        Self::Pattern(err.to_string())
    }
}

impl From<glob::GlobError> for CoreError {
    fn from(err: glob::GlobError) -> Self {
        Self::Io(err.into_error())
    }
}
