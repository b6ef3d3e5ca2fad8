//! Provider wiring for the configured backend

use std::sync::Arc;

use crate::config::{BackendProvider, RagConfig};
use crate::error::Result;

use super::local::LocalArtifactStore;
use super::ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
use super::{ArtifactStore, EmbeddingProvider, LlmProvider};

/// The set of providers used by the index builder and the query pipeline
#[derive(Clone)]
pub struct Providers {
    /// Embeds summaries (documents) and queries
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Answers questions at the configured temperature
    pub answer_llm: Arc<dyn LlmProvider>,
    /// Summarizes document units for the index
    pub summary_llm: Arc<dyn LlmProvider>,
    /// Holds the persisted artifact
    pub store: Arc<dyn ArtifactStore>,
}

impl Providers {
    /// Construct providers for `config.backend`
    pub async fn from_config(config: &RagConfig) -> Result<Self> {
        match config.backend {
            BackendProvider::Local => {
                tracing::info!("Using local backend (Ollama + filesystem)");
                let client = Arc::new(OllamaClient::new(&config.ollama)?);
                let embedder = Arc::new(OllamaEmbedder::from_client(
                    Arc::clone(&client),
                    config.ollama.embed_model.clone(),
                ));
                let answer_llm = Arc::new(OllamaLlm::from_client(
                    Arc::clone(&client),
                    config.ollama.generate_model.clone(),
                    config.models.temperature,
                ));
                let summary_llm = Arc::new(OllamaLlm::from_client(
                    client,
                    config.ollama.generate_model.clone(),
                    config.models.summary_temperature,
                ));
                let store = Arc::new(LocalArtifactStore::new(&config.artifact.local_store_dir)?);

                Ok(Self {
                    embedder,
                    answer_llm,
                    summary_llm,
                    store,
                })
            }
            BackendProvider::Gcp => {
                #[cfg(feature = "gcp")]
                {
                    use super::gcp::{GcpAuth, GcsArtifactStore, GeminiClient, VertexAiEmbedder};

                    let gcp = &config.gcp;
                    let models = &config.models;
                    tracing::info!(
                        "Using GCP backend (project: {}, region: {})",
                        gcp.project_id,
                        gcp.location
                    );

                    let auth = Arc::new(GcpAuth::from_config(gcp)?);

                    let embedder = Arc::new(
                        VertexAiEmbedder::new(
                            Arc::clone(&auth),
                            gcp.location.clone(),
                            Some(models.embedding_model.clone()),
                        )
                        .with_batch_size(config.indexing.embedding_batch_size),
                    );

                    let answer_llm = Arc::new(
                        GeminiClient::new(
                            Arc::clone(&auth),
                            gcp.location.clone(),
                            Some(models.generation_model.clone()),
                            models.temperature,
                        )
                        .with_max_output_tokens(models.max_output_tokens),
                    );

                    let summary_llm = Arc::new(
                        GeminiClient::new(
                            auth,
                            gcp.location.clone(),
                            Some(models.summary_model.clone()),
                            models.summary_temperature,
                        )
                        .with_max_output_tokens(models.max_output_tokens),
                    );

                    let store = Arc::new(GcsArtifactStore::new(gcp.bucket_name()).await?);

                    tracing::info!(
                        "GCP providers initialized (embedding: {}, llm: {}, bucket: {})",
                        models.embedding_model,
                        models.generation_model,
                        store.bucket()
                    );

                    Ok(Self {
                        embedder,
                        answer_llm,
                        summary_llm,
                        store,
                    })
                }
                #[cfg(not(feature = "gcp"))]
                {
                    Err(crate::error::Error::Config(
                        "GCP backend selected but gcp feature is not enabled. \
                         Rebuild with --features gcp"
                            .to_string(),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_backend_wiring() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RagConfig::default();
        config.backend = BackendProvider::Local;
        config.artifact.local_store_dir = dir.path().join("bucket");

        let providers = Providers::from_config(&config).await.unwrap();
        assert_eq!(providers.embedder.name(), "ollama");
        assert_eq!(providers.answer_llm.model(), "llama3.2:3b");
        assert_eq!(providers.store.name(), "local-filesystem");
        assert!(dir.path().join("bucket").exists());
    }
}
