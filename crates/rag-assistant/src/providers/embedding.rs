//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;
use crate::error::Result;

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OllamaEmbedder`: Local Ollama server (nomic-embed-text)
/// - `VertexAiEmbedder`: Google Vertex AI (gemini-embedding-001)
///
/// `embed` is used for queries and `embed_batch` for indexed documents; a
/// provider may encode the two differently (Vertex AI task types).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single query text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate document embeddings for multiple texts, preserving order
    ///
    /// Default implementation calls `embed` sequentially.
    /// Implementations should override for better performance.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get provider name for logging
    fn name(&self) -> &str;
}
