//! Ollama client for query embeddings.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::lightrag::context::truncate_chars;
use crate::{Error, Result};

/// Ollama client bound to one embedding model.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
    max_input_chars: usize,
    timeout: Duration,
    dimension: Option<usize>,
}

impl OllamaClient {
    /// Create client from the embedding section of the config.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent("lightrag_chat/0.1.0")
            .build()
            .map_err(|e| Error::InvalidArgument(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_input_chars: config.max_input_chars,
            timeout: config.timeout,
            dimension: config.dimension,
        })
    }

    /// Embedding model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check if Ollama server is running.
    pub async fn is_running(&self) -> bool {
        self.http
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// List available models.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::InvalidArgument(format!("Ollama request failed: {}", e)))?;

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidArgument(format!("Invalid response: {}", e)))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Embed a single text with the configured model.
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::EmbeddingUnavailable("empty input".to_string()));
        }

        let input = truncate_chars(text, self.max_input_chars);
        let request = EmbedRequest {
            model: &self.model,
            input,
        };

        let response = self
            .http
            .post(format!("{}/api/embed", self.base_url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::EmbeddingUnavailable(format!(
                        "Ollama timed out after {}s",
                        self.timeout.as_secs_f32()
                    ))
                } else {
                    Error::EmbeddingUnavailable(format!("Ollama request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("Ollama embedding error {}: {}", status, text);
            return Err(Error::EmbeddingUnavailable(format!(
                "Ollama error {}: {}",
                status, text
            )));
        }

        let result: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(format!("Invalid response: {}", e)))?;

        let vector = result
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::EmbeddingUnavailable("No embeddings returned from Ollama".to_string())
            })?;

        if let Some(expected) = self.dimension {
            if vector.len() != expected {
                return Err(Error::EmbeddingUnavailable(format!(
                    "expected {}-dimensional vector, got {}",
                    expected,
                    vector.len()
                )));
            }
        }

        debug!(
            model = %self.model,
            chars = input.chars().count(),
            dim = vector.len(),
            "Query embedded"
        );
        Ok(vector)
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_text(text).await
    }
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}
