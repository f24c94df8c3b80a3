//! Completion provider abstraction.
//!
//! A single seam `(prompt) -> text | error` over Ollama-style and
//! OpenAI-compatible endpoints, with a fake implementation for
//! deterministic tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

/// Completion provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Completion errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompletionError {
    #[error("completion provider is disabled in configuration")]
    Disabled,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Generic completion client.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send a prompt and return the provider's text answer.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError>;
}

/// Real completion client over HTTP.
pub struct HttpCompletionClient {
    config: CompletionConfig,
    client: reqwest::Client,
}

impl HttpCompletionClient {
    pub fn new(config: CompletionConfig) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CompletionError::Http(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Check if the endpoint is Ollama-style.
    fn is_ollama_endpoint(&self) -> bool {
        self.config.endpoint.contains("11434") || self.config.endpoint.contains("ollama")
    }

    /// Call an Ollama-style `/api/generate` endpoint.
    async fn call_ollama(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/api/generate", self.config.endpoint);

        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout(self.config.timeout_secs)
            } else {
                CompletionError::Http(format!("request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            return Err(CompletionError::Http(format!(
                "HTTP {} from provider",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(format!("failed to parse response: {}", e)))?;

        let text = json
            .get("response")
            .and_then(|v| v.as_str())
            .ok_or(CompletionError::EmptyResponse)?;

        if text.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }

        Ok(text.to_string())
    }

    /// Call an OpenAI-compatible `/v1/chat/completions` endpoint.
    async fn call_openai_compatible(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        let url = format!("{}/v1/chat/completions", self.config.endpoint);

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
        });

        let mut request = self.client.post(&url).json(&body);

        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout(self.config.timeout_secs)
            } else {
                CompletionError::Http(format!("request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            return Err(CompletionError::Http(format!(
                "HTTP {} from provider",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(format!("failed to parse response: {}", e)))?;

        let text = json
            .get("choices")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("message"))
            .and_then(|v| v.get("content"))
            .and_then(|v| v.as_str())
            .ok_or(CompletionError::EmptyResponse)?;

        if text.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }

        Ok(text.to_string())
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        if !self.config.enabled {
            return Err(CompletionError::Disabled);
        }

        if self.is_ollama_endpoint() {
            let full_prompt = format!("{}\n\n{}", system_prompt, user_prompt);
            match self.call_ollama(&full_prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::debug!("Ollama API failed, trying OpenAI-compatible: {}", e);
                }
            }
        }

        self.call_openai_compatible(system_prompt, user_prompt).await
    }
}

/// Fake completion client for testing.
///
/// Returns pre-defined responses in order (the last one repeats) and
/// records every prompt it receives.
pub struct FakeCompletionClient {
    responses: Mutex<Vec<Result<String, CompletionError>>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeCompletionClient {
    pub fn new(responses: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A client that always answers with the same text.
    pub fn always_text(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// A client that always fails with the same error.
    pub fn always_error(error: CompletionError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Prompts received so far, system and user parts joined.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for FakeCompletionClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        self.prompts
            .lock()
            .unwrap()
            .push(format!("{}\n\n{}", system_prompt, user_prompt));

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }

        if responses.len() == 1 {
            responses[0].clone()
        } else {
            responses.remove(0)
        }
    }
}
