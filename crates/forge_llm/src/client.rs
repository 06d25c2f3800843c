//! Completion client trait and request type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Output-length cap used when a caller does not pick one.
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// A single completion request as the pipeline sees it.
///
/// The system instruction is kept apart from the task prompt; clients
/// decide how to combine them on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionPrompt {
    pub prompt: String,
    pub system_prompt: String,
    pub max_tokens: u32,
}

impl CompletionPrompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: String::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// System instruction and task prompt joined by a blank line.
    pub fn full_prompt(&self) -> String {
        if self.system_prompt.is_empty() {
            self.prompt.clone()
        } else {
            format!("{}\n\n{}", self.system_prompt, self.prompt)
        }
    }
}

/// A text-completion backend.
///
/// Implementations swallow and log their own failures: `None` is the only
/// failure signal callers see.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionPrompt) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_prompt_with_system() {
        let prompt = CompletionPrompt::new("Write tests").with_system("You are a C++ expert");
        assert_eq!(prompt.full_prompt(), "You are a C++ expert\n\nWrite tests");
    }

    #[test]
    fn test_full_prompt_without_system() {
        let prompt = CompletionPrompt::new("Write tests");
        assert_eq!(prompt.full_prompt(), "Write tests");
        assert_eq!(prompt.max_tokens, DEFAULT_MAX_TOKENS);
    }
}
