//! Ollama backend implementation
//!
//! HTTP client for the Ollama generate API. The system instruction travels
//! in the `system` field, the task prompt in `prompt`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OracleConfig;
use crate::error::{Error, Result};

use super::types::CompletionRequest;
use super::{build_http_client, AIBackend};

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
    options: OracleConfig,
}

impl OllamaBackend {
    pub fn new(base_url: &str, model: &str) -> Self {
        let options = OracleConfig::default();
        Self {
            http_client: build_http_client(&options),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            options,
        }
    }

    /// Apply request settings (timeout, temperature, token limit)
    pub fn with_options(mut self, options: &OracleConfig) -> Self {
        self.http_client = build_http_client(options);
        self.options = options.clone();
        self
    }

    /// Create from environment variables
    ///
    /// Required: `OLLAMA_HOST`
    /// Optional: `OLLAMA_MODEL` (default: llama3.2)
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }

    fn build_request(&self, request: &CompletionRequest) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            prompt: request.user.clone(),
            system: (!request.system.is_empty()).then(|| request.system.clone()),
            stream: false,
            options: OllamaOptions {
                temperature: self.options.temperature,
                num_predict: self.options.max_tokens,
            },
        }
    }
}

/// Request to Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Response from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl AIBackend for OllamaBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = self.build_request(request);

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::OracleUnavailable(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::OracleUnavailable(format!(
                "Ollama API error {}: {}",
                status, body
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::OracleUnavailable(format!("Failed to read response: {}", e)))?;

        let generated: OllamaResponse = serde_json::from_str(&text)
            .map_err(|e| Error::malformed(format!("Unexpected Ollama body: {}", e), &text))?;

        debug!(model = %self.model, "Ollama response: {}", generated.response);
        Ok(generated.response)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
