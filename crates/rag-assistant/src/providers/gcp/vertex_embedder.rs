//! Vertex AI embedding provider
//!
//! Queries are embedded with task type `RETRIEVAL_QUERY`, indexed summaries
//! with `RETRIEVAL_DOCUMENT`.

use async_trait::async_trait;
use std::sync::Arc;

use super::auth::GcpAuth;
use crate::error::{Error, Result};
use crate::providers::embedding::EmbeddingProvider;

/// Vertex AI embedding provider
pub struct VertexAiEmbedder {
    auth: Arc<GcpAuth>,
    model: String,
    location: String,
    batch_size: usize,
}

impl VertexAiEmbedder {
    /// Create a new Vertex AI embedder
    ///
    /// # Arguments
    /// * `auth` - GCP authentication
    /// * `location` - GCP region (e.g., "europe-west1")
    /// * `model` - Model name (default: "gemini-embedding-001")
    pub fn new(auth: Arc<GcpAuth>, location: String, model: Option<String>) -> Self {
        Self {
            auth,
            model: model.unwrap_or_else(|| "gemini-embedding-001".to_string()),
            location,
            batch_size: 1,
        }
    }

    /// Texts sent per predict call (at least 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Get the API endpoint URL
    fn endpoint(&self) -> String {
        format!(
            "https://{}-aiplatform.googleapis.com/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            self.location,
            self.auth.project_id(),
            self.location,
            self.model
        )
    }

    async fn predict(
        &self,
        client: &reqwest::Client,
        texts: &[String],
        task_type: &'static str,
    ) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            instances: texts
                .iter()
                .map(|t| EmbedInstance {
                    content: t.clone(),
                    task_type,
                })
                .collect(),
        };

        let response = client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Vertex AI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Vertex AI embedding failed ({}): {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse Vertex AI response: {}", e)))?;

        if embed_response.predictions.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Vertex AI returned {} embeddings for {} texts",
                embed_response.predictions.len(),
                texts.len()
            )));
        }

        Ok(embed_response
            .predictions
            .into_iter()
            .map(|p| p.embeddings.values)
            .collect())
    }
}

#[derive(serde::Serialize)]
struct EmbedRequest {
    instances: Vec<EmbedInstance>,
}

#[derive(serde::Serialize)]
struct EmbedInstance {
    content: String,
    task_type: &'static str,
}

#[derive(serde::Deserialize)]
struct EmbedResponse {
    predictions: Vec<EmbedPrediction>,
}

#[derive(serde::Deserialize)]
struct EmbedPrediction {
    embeddings: EmbeddingValues,
}

#[derive(serde::Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for VertexAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let client = self.auth.authorized_client().await?;

        self.predict(&client, &[text.to_string()], "RETRIEVAL_QUERY")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("No embedding in response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let client = self.auth.authorized_client().await?;
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let embeddings = self.predict(&client, chunk, "RETRIEVAL_DOCUMENT").await?;
            all_embeddings.extend(embeddings);
        }

        tracing::debug!("Embedded {} documents with {}", all_embeddings.len(), self.model);
        Ok(all_embeddings)
    }

    fn name(&self) -> &str {
        "vertex-ai"
    }
}
