//! Retrieve, prompt, generate

use std::sync::Arc;
use std::time::Instant;

use crate::artifact::PersistedArtifact;
use crate::config::RagConfig;
use crate::error::Result;
use crate::providers::{LlmProvider, Providers};
use crate::retrieval::{Retriever, VectorIndex};

use super::prompt::{PromptBuilder, PromptTemplate, RAG_TEMPLATE};

/// Ready-to-serve answer pipeline
///
/// Built once per process from the persisted artifact. Every request reuses
/// the same index, retriever and model client.
pub struct RagPipeline {
    retriever: Retriever,
    template: PromptTemplate,
    llm: Arc<dyn LlmProvider>,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, llm: Arc<dyn LlmProvider>) -> Result<Self> {
        Ok(Self {
            retriever,
            template: PromptTemplate::from_template(RAG_TEMPLATE)?,
            llm,
        })
    }

    /// Fetch the artifact and assemble the pipeline
    pub async fn load(providers: &Providers, config: &RagConfig) -> Result<Self> {
        let start = Instant::now();
        tracing::info!("Cold start: initializing RAG pipeline");

        let artifact = PersistedArtifact::fetch(providers.store.as_ref(), &config.artifact).await?;
        let index = VectorIndex::build(artifact)?;
        tracing::info!(
            "Vector index built ({} passages, {} dimensions)",
            index.len(),
            index.dimensions()
        );

        let retriever = Retriever::new(
            Arc::new(index),
            Arc::clone(&providers.embedder),
            config.retrieval.top_k,
        );
        let pipeline = Self::new(retriever, Arc::clone(&providers.answer_llm))?;

        tracing::info!(
            "RAG pipeline initialized in {}ms (llm: {})",
            start.elapsed().as_millis(),
            pipeline.llm.model()
        );
        Ok(pipeline)
    }

    /// Answer `query` from retrieved context
    pub async fn answer(&self, query: &str) -> Result<String> {
        let results = self.retriever.retrieve(query).await?;
        let context = PromptBuilder::build_context(&results);
        let prompt = self
            .template
            .format(&[("context", &context), ("question", query)])?;

        self.llm.generate(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::providers::testing::{FailingEmbedder, KeywordEmbedder, RecordingLlm};

    fn artifact() -> PersistedArtifact {
        let summaries = [
            "self-attention relates positions sequence",
            "training data wmt english german",
        ];
        let texts = vec![
            "Self-attention, sometimes called intra-attention, relates positions.".to_string(),
            "We trained on the WMT 2014 English-German dataset.".to_string(),
        ];
        let embeddings = summaries.iter().map(|s| KeywordEmbedder::vector(s)).collect();
        PersistedArtifact::from_parts(embeddings, texts).unwrap()
    }

    fn pipeline(llm: Arc<RecordingLlm>, top_k: usize) -> RagPipeline {
        let index = VectorIndex::build(artifact()).unwrap();
        let embedder = Arc::new(KeywordEmbedder::default());
        let retriever = Retriever::new(Arc::new(index), embedder, top_k);
        RagPipeline::new(retriever, llm).unwrap()
    }

    #[tokio::test]
    async fn test_prompt_carries_original_text_not_summary() {
        let llm = Arc::new(RecordingLlm::default());
        let answer = pipeline(llm.clone(), 1)
            .answer("What does self-attention relate?")
            .await
            .unwrap();

        let prompts = llm.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert_eq!(
            prompts[0],
            "Answer the question based only on the following context:\n\
             Self-attention, sometimes called intra-attention, relates positions.\n\n\
             Question: What does self-attention relate?"
        );
        assert!(answer.starts_with("generated: "));
    }

    #[tokio::test]
    async fn test_context_joined_with_blank_lines() {
        let llm = Arc::new(RecordingLlm::default());
        pipeline(llm.clone(), 4).answer("which dataset?").await.unwrap();

        let prompt = llm.prompts.lock()[0].clone();
        assert!(prompt.contains("relates positions.\n\nWe trained")
            || prompt.contains("dataset.\n\nSelf-attention"));
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let llm = Arc::new(RecordingLlm::failing_on("Question:"));
        let err = pipeline(llm, 2).answer("anything").await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let index = VectorIndex::build(artifact()).unwrap();
        let retriever = Retriever::new(Arc::new(index), Arc::new(FailingEmbedder), 4);
        let pipeline = RagPipeline::new(retriever, Arc::new(RecordingLlm::default())).unwrap();

        assert!(matches!(
            pipeline.answer("q").await.unwrap_err(),
            Error::Embedding(_)
        ));
    }
}
