//! Query-to-passages retriever

use std::sync::Arc;

use crate::error::Result;
use crate::providers::EmbeddingProvider;

use super::search::{SearchResult, VectorIndex};

/// Embeds a query and returns the nearest indexed passages
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            top_k,
        }
    }

    /// Passages for `query`, most similar first
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>> {
        if self.index.is_empty() {
            tracing::warn!("Vector index is empty; answering without context");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let results = self.index.search(&query_embedding, self.top_k)?;

        tracing::debug!(
            "Retrieved {} passages (best similarity {:.3})",
            results.len(),
            results.first().map(|r| r.similarity).unwrap_or(0.0)
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::PersistedArtifact;
    use crate::providers::testing::KeywordEmbedder;
    use std::sync::atomic::Ordering;

    fn passages() -> (Vec<String>, Vec<String>) {
        let texts = vec![
            "Self-attention relates different positions of a single sequence.".to_string(),
            "The optimizer was Adam with warmup steps.".to_string(),
            "Positional encodings use sine and cosine functions.".to_string(),
        ];
        let summaries = vec![
            "self-attention relates positions sequence".to_string(),
            "optimizer adam warmup".to_string(),
            "positional encodings sine cosine".to_string(),
        ];
        (texts, summaries)
    }

    #[tokio::test]
    async fn test_retrieves_original_text_for_matching_summary() {
        let (texts, summaries) = passages();
        let embeddings = summaries.iter().map(|s| KeywordEmbedder::vector(s)).collect();
        let artifact = PersistedArtifact::from_parts(embeddings, texts).unwrap();
        let index = VectorIndex::build(artifact).unwrap();

        let embedder = Arc::new(KeywordEmbedder::default());
        let retriever = Retriever::new(Arc::new(index), embedder.clone(), 1);

        let results = retriever.retrieve("which optimizer and warmup?").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "The optimizer was Adam with warmup steps.");
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_index_skips_embedding_call() {
        let index = VectorIndex::build(PersistedArtifact::default()).unwrap();
        let embedder = Arc::new(KeywordEmbedder::default());
        let retriever = Retriever::new(Arc::new(index), embedder.clone(), 4);

        assert!(retriever.retrieve("anything").await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }
}
