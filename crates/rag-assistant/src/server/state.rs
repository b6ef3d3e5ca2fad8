//! Shared application state for the query server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::generation::cache::{ArtifactPipelineLoader, PipelineCache, PipelineLoader};

/// Shared application state
///
/// Holds only the pipeline cache; everything else is built lazily on the
/// first request.
#[derive(Clone)]
pub struct AppState {
    cache: Arc<PipelineCache>,
}

impl AppState {
    /// State that loads the pipeline from the configured backend
    pub fn new(config: RagConfig) -> Self {
        Self::with_loader(ArtifactPipelineLoader::new(config))
    }

    /// State backed by an explicit loader
    pub fn with_loader(loader: impl PipelineLoader + 'static) -> Self {
        Self {
            cache: Arc::new(PipelineCache::new(loader)),
        }
    }

    pub fn cache(&self) -> &Arc<PipelineCache> {
        &self.cache
    }

    /// Whether the pipeline has been initialized
    pub fn is_ready(&self) -> bool {
        self.cache.is_initialized()
    }
}
