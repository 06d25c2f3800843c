//! Error types for toolchain execution.

use thiserror::Error;

/// Result type alias for toolchain operations.
pub type ToolchainResult<T> = Result<T, ToolchainError>;

/// Errors that can occur while running toolchain commands.
///
/// A command that runs and exits non-zero is not an error; it is reported
/// through [`crate::ExecutionResult::exit_code`].
#[derive(Error, Debug)]
pub enum ToolchainError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command timed out after {seconds} seconds: {command}")]
    Timeout { command: String, seconds: u64 },

    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
