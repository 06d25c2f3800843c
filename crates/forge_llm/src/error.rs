//! Error types for the completion client.

use thiserror::Error;

/// Result type alias for completion operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Errors raised while talking to the completion service.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed LLM response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("Invalid LLM configuration: {0}")]
    InvalidConfig(String),
}
