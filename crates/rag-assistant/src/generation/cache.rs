//! Process-wide lazily initialized pipeline
//!
//! The first request builds the pipeline; concurrent first requests wait on
//! the same initialization. A failed initialization leaves the cache empty,
//! so the next request retries from scratch.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::RagConfig;
use crate::error::Result;
use crate::providers::Providers;

use super::pipeline::RagPipeline;

/// Builds a [`RagPipeline`] on demand
#[async_trait]
pub trait PipelineLoader: Send + Sync {
    async fn load(&self) -> Result<RagPipeline>;
}

/// Loads the pipeline from the configured artifact store
///
/// Providers are created inside `load` unless injected, so a failing cloud
/// client surfaces as a request error rather than a startup crash.
pub struct ArtifactPipelineLoader {
    config: RagConfig,
    providers: Option<Providers>,
}

impl ArtifactPipelineLoader {
    pub fn new(config: RagConfig) -> Self {
        Self {
            config,
            providers: None,
        }
    }

    /// Use already constructed providers
    pub fn with_providers(mut self, providers: Providers) -> Self {
        self.providers = Some(providers);
        self
    }
}

#[async_trait]
impl PipelineLoader for ArtifactPipelineLoader {
    async fn load(&self) -> Result<RagPipeline> {
        match &self.providers {
            Some(providers) => RagPipeline::load(providers, &self.config).await,
            None => {
                let providers = Providers::from_config(&self.config).await?;
                RagPipeline::load(&providers, &self.config).await
            }
        }
    }
}

/// At-most-once pipeline cache shared by all request handlers
pub struct PipelineCache {
    loader: Box<dyn PipelineLoader>,
    cell: OnceCell<Arc<RagPipeline>>,
}

impl PipelineCache {
    pub fn new(loader: impl PipelineLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            cell: OnceCell::new(),
        }
    }

    /// The pipeline, initializing it on first use
    pub async fn get(&self) -> Result<Arc<RagPipeline>> {
        let pipeline = self
            .cell
            .get_or_try_init(|| async {
                match self.loader.load().await {
                    Ok(pipeline) => Ok(Arc::new(pipeline)),
                    Err(e) => {
                        tracing::error!("Pipeline initialization failed: {}", e);
                        Err(e)
                    }
                }
            })
            .await?;
        Ok(Arc::clone(pipeline))
    }

    /// Answer through the cached pipeline
    pub async fn answer(&self, query: &str) -> Result<String> {
        self.get().await?.answer(query).await
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}
