//! Summarize-then-embed index builder

use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::artifact::{ArtifactLocation, PersistedArtifact};
use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::{PromptTemplate, SUMMARY_TEMPLATE};
use crate::providers::{ArtifactStore, EmbeddingProvider, LlmProvider, Providers};

use super::loader::DocumentLoader;

/// Where a build writes its artifact
#[derive(Debug, Clone)]
pub struct BuildTarget {
    /// Upload to the artifact store
    pub upload: bool,
    /// Also write the blobs into this directory
    pub output_dir: Option<PathBuf>,
}

impl Default for BuildTarget {
    fn default() -> Self {
        Self {
            upload: true,
            output_dir: None,
        }
    }
}

/// Outcome of a completed build
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub units: usize,
    pub dimensions: Option<usize>,
    pub uploaded: Option<ArtifactLocation>,
    pub written: Option<ArtifactLocation>,
}

/// Offline job turning a source document into a [`PersistedArtifact`]
///
/// Each unit is summarized, the summary is embedded, and the embedding is
/// stored next to the original unit text. Any failure aborts the run
/// before anything is written.
pub struct IndexBuilder {
    loader: DocumentLoader,
    summary_llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn ArtifactStore>,
    summary_template: PromptTemplate,
    config: RagConfig,
}

impl IndexBuilder {
    pub fn new(config: RagConfig, providers: &Providers) -> Result<Self> {
        Ok(Self {
            loader: DocumentLoader::new(&config.indexing)?,
            summary_llm: Arc::clone(&providers.summary_llm),
            embedder: Arc::clone(&providers.embedder),
            store: Arc::clone(&providers.store),
            summary_template: PromptTemplate::from_template(SUMMARY_TEMPLATE)?,
            config,
        })
    }

    /// Load, summarize and embed `source`
    pub async fn build(&self, source: &str) -> Result<PersistedArtifact> {
        let start = Instant::now();
        tracing::info!("Starting index build for {}", source);

        let units = self.loader.load_units(source).await?;
        if units.is_empty() {
            tracing::warn!("{} has no text; building an empty index", source);
            return Ok(PersistedArtifact::default());
        }

        let summaries = self.summarize(&units).await?;
        tracing::info!("Generated {} summaries", summaries.len());

        let embeddings = self.embed(&summaries).await?;
        tracing::info!("Created {} embeddings", embeddings.len());

        let artifact = PersistedArtifact::from_parts(embeddings, units)?;
        tracing::info!(
            "Index built in {:.1}s ({} passages)",
            start.elapsed().as_secs_f32(),
            artifact.len()
        );
        Ok(artifact)
    }

    /// One summary per unit, in unit order
    pub async fn summarize(&self, units: &[String]) -> Result<Vec<String>> {
        let concurrency = self.config.indexing.summary_concurrency.max(1);
        let llm = &self.summary_llm;
        let template = &self.summary_template;

        stream::iter(units.iter().enumerate())
            .map(|(i, unit)| async move {
                let prompt = template.format(&[("text", unit.as_str())])?;
                let summary = llm.generate(&prompt).await.map_err(|e| {
                    tracing::error!("Summary of unit {} failed: {}", i, e);
                    e
                })?;
                tracing::debug!("Summarized unit {} ({} chars)", i, summary.len());
                Ok::<_, Error>(summary.trim().to_string())
            })
            .buffered(concurrency)
            .try_collect()
            .await
    }

    /// Document embeddings for `summaries`, in order
    pub async fn embed(&self, summaries: &[String]) -> Result<Vec<Vec<f32>>> {
        let batch_size = self.config.indexing.embedding_batch_size.max(1);
        let mut embeddings = Vec::with_capacity(summaries.len());

        for batch in summaries.chunks(batch_size) {
            let vectors = self.embedder.embed_batch(batch).await?;
            if vectors.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "{} returned {} vectors for {} texts",
                    self.embedder.name(),
                    vectors.len(),
                    batch.len()
                )));
            }
            embeddings.extend(vectors);
        }

        Ok(embeddings)
    }

    /// Build and then write the artifact to `target`
    ///
    /// The store upload runs first; the local copy is only written once the
    /// upload has gone through.
    pub async fn run(&self, source: &str, target: &BuildTarget) -> Result<BuildReport> {
        let artifact = self.build(source).await?;

        let uploaded = if target.upload {
            Some(artifact.persist(self.store.as_ref(), &self.config.artifact).await?)
        } else {
            None
        };

        let written = match &target.output_dir {
            Some(dir) => {
                let location = artifact.write_to_dir(dir, &self.config.artifact).await?;
                tracing::info!("Wrote index files to {}", dir.display());
                Some(location)
            }
            None => None,
        };

        Ok(BuildReport {
            units: artifact.len(),
            dimensions: artifact.dimensions(),
            uploaded,
            written,
        })
    }
}
