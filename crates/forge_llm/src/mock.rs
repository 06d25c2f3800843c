//! Mock completion client for testing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::client::{CompletionClient, CompletionPrompt};

/// Scripted completion client.
///
/// Queued responses are returned in order; once the queue is drained the
/// fallback response is used. Empty text is normalized to `None`, exactly
/// like the HTTP client does.
#[derive(Clone, Default)]
pub struct MockCompletionClient {
    queued: Arc<RwLock<VecDeque<Option<String>>>>,
    fallback: Arc<RwLock<Option<String>>>,
    captured: Arc<RwLock<Vec<CompletionPrompt>>>,
}

impl MockCompletionClient {
    /// Create a mock that fails every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful completion.
    pub fn respond(self, text: impl Into<String>) -> Self {
        self.queued.write().push_back(Some(text.into()));
        self
    }

    /// Queue a failed completion.
    pub fn fail(self) -> Self {
        self.queued.write().push_back(None);
        self
    }

    /// Answer every request with `text` once the queue is empty.
    pub fn always(self, text: impl Into<String>) -> Self {
        *self.fallback.write() = Some(text.into());
        self
    }

    /// Get all captured requests.
    pub fn requests(&self) -> Vec<CompletionPrompt> {
        self.captured.read().clone()
    }

    /// Number of requests made.
    pub fn call_count(&self) -> usize {
        self.captured.read().len()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, request: &CompletionPrompt) -> Option<String> {
        self.captured.write().push(request.clone());

        let next = self.queued.write().pop_front();
        let response = match next {
            Some(response) => response,
            None => self.fallback.read().clone(),
        };
        response.filter(|text| !text.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_then_fallback() {
        let client = MockCompletionClient::new()
            .respond("first")
            .fail()
            .always("later");
        let request = CompletionPrompt::new("p");

        assert_eq!(client.complete(&request).await.as_deref(), Some("first"));
        assert_eq!(client.complete(&request).await, None);
        assert_eq!(client.complete(&request).await.as_deref(), Some("later"));
        assert_eq!(client.complete(&request).await.as_deref(), Some("later"));
        assert_eq!(client.call_count(), 4);
    }

    #[tokio::test]
    async fn test_empty_text_is_failure() {
        let client = MockCompletionClient::new().respond("   \n");
        assert_eq!(client.complete(&CompletionPrompt::new("p")).await, None);
    }

    #[tokio::test]
    async fn test_default_fails() {
        let client = MockCompletionClient::new();
        assert_eq!(client.complete(&CompletionPrompt::new("p")).await, None);
        assert_eq!(client.requests()[0].prompt, "p");
    }
}
