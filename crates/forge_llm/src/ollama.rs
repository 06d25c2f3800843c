//! HTTP client for an Ollama-style generate endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{CompletionClient, CompletionPrompt};
use crate::error::{LlmError, LlmResult};

/// Connection and decoding settings for [`OllamaClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: "llama3.1".to_string(),
            timeout_seconds: 120,
            temperature: 0.3,
            top_p: 0.9,
        }
    }
}

impl OllamaConfig {
    /// Defaults overridden by environment variables.
    ///
    /// Reads `TESTFORGE_LLM_URL`, `TESTFORGE_LLM_MODEL` and
    /// `TESTFORGE_LLM_TIMEOUT_SECS`.
    pub fn from_env() -> LlmResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> LlmResult<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("TESTFORGE_LLM_URL").filter(|v| !v.is_empty()) {
            config.endpoint = url;
        }
        if let Some(model) = lookup("TESTFORGE_LLM_MODEL").filter(|v| !v.is_empty()) {
            config.model = model;
        }
        if let Some(timeout) = lookup("TESTFORGE_LLM_TIMEOUT_SECS").filter(|v| !v.is_empty()) {
            config.timeout_seconds = timeout.parse().map_err(|_| {
                LlmError::InvalidConfig(format!(
                    "TESTFORGE_LLM_TIMEOUT_SECS must be a whole number of seconds, got {:?}",
                    timeout
                ))
            })?;
        }

        Ok(config)
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// Completion client for an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaClient {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> LlmResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Wire body for a completion request.
    pub fn request_body(&self, request: &CompletionPrompt) -> GenerateRequest {
        GenerateRequest {
            model: self.config.model.clone(),
            prompt: request.full_prompt(),
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                max_tokens: request.max_tokens,
            },
        }
    }

    /// Send one request and return the generated text, propagating failures.
    pub async fn try_complete(&self, request: &CompletionPrompt) -> LlmResult<String> {
        let body = self.request_body(request);
        debug!(
            "POST {} (model={}, {} prompt chars)",
            self.config.endpoint,
            body.model,
            body.prompt.len()
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&text)?;
        Ok(parsed.response)
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(&self, request: &CompletionPrompt) -> Option<String> {
        match self.try_complete(request).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                warn!("LLM returned an empty completion");
                None
            }
            Err(e) => {
                warn!("Error calling LLM: {}", e);
                None
            }
        }
    }
}

/// Request body for `/api/generate`.
#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
}

#[derive(Debug, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = OllamaConfig::default();
        assert_eq!(config.endpoint, "http://localhost:11434/api/generate");
        assert_eq!(config.model, "llama3.1");
        assert_eq!(config.timeout_seconds, 120);
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("TESTFORGE_LLM_URL", "http://gpu-box:11434/api/generate"),
            ("TESTFORGE_LLM_MODEL", "codellama"),
            ("TESTFORGE_LLM_TIMEOUT_SECS", "30"),
        ]
        .into_iter()
        .collect();

        let config = OllamaConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.endpoint, "http://gpu-box:11434/api/generate");
        assert_eq!(config.model, "codellama");
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_config_rejects_bad_timeout() {
        let result = OllamaConfig::from_lookup(|k| {
            (k == "TESTFORGE_LLM_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(LlmError::InvalidConfig(_))));
    }

    #[test]
    fn test_request_body_shape() {
        let client = OllamaClient::new(OllamaConfig::default()).unwrap();
        let request = CompletionPrompt::new("Write tests")
            .with_system("Be terse")
            .with_max_tokens(512);

        let json = serde_json::to_value(client.request_body(&request)).unwrap();

        assert_eq!(json["model"], "llama3.1");
        assert_eq!(json["prompt"], "Be terse\n\nWrite tests");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["max_tokens"], 512);
        assert!((json["options"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert!((json["options"]["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    }
}
