//! # forge_llm
//!
//! Text-completion client for testforge.
//!
//! The pipeline talks to the model through the [`CompletionClient`] trait.
//! A completion is `Option<String>`: `None` means generation failed for any
//! reason (transport, status, malformed body, empty text) and must never be
//! written to disk.
//!
//! - [`OllamaClient`]: HTTP client for an Ollama-style `/api/generate` endpoint
//! - [`MockCompletionClient`]: scripted responses for tests

pub mod client;
pub mod error;
pub mod mock;
pub mod ollama;

pub use client::{CompletionClient, CompletionPrompt, DEFAULT_MAX_TOKENS};
pub use error::{LlmError, LlmResult};
pub use mock::MockCompletionClient;
pub use ollama::{OllamaClient, OllamaConfig};
