//! Ollama-based providers for embeddings and LLM
//!
//! Both providers share one `OllamaClient`. Requests are not retried: a
//! failed call surfaces immediately to the index builder or the request
//! boundary.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::OllamaConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Ollama API client
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Base URL of the Ollama server
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Generate an embedding
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest { model, prompt: text })
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Ollama embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::embedding(format!(
                "Ollama embedding failed ({}): {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response.json().await.map_err(|e| {
            Error::embedding(format!("Failed to parse Ollama embedding response: {}", e))
        })?;

        Ok(embed_response.embedding)
    }

    /// Generate a completion for a prompt
    pub async fn generate(&self, model: &str, prompt: &str, temperature: f32) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::llm(format!("Ollama generation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::llm(format!(
                "Ollama generation failed ({}): {}",
                status, body
            )));
        }

        let generate_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(generate_response.response)
    }
}

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaEmbedder {
    /// Create from an existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(&self.model, text).await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama LLM provider with a fixed temperature
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
    temperature: f32,
}

impl OllamaLlm {
    /// Create from an existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: String, temperature: f32) -> Self {
        Self {
            client,
            model,
            temperature,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.client
            .generate(&self.model, prompt, self.temperature)
            .await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
