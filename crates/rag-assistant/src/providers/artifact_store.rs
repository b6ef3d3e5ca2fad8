//! Blob storage for the persisted index artifact

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// Named-blob storage shared by the index builder (writer) and the query
/// server (reader)
///
/// Implementations:
/// - `LocalArtifactStore`: a filesystem directory
/// - `GcsArtifactStore`: a Google Cloud Storage bucket
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store a blob under `name`, replacing any previous content
    ///
    /// Returns the storage URI
    async fn upload(&self, name: &str, data: Vec<u8>) -> Result<String>;

    /// Fetch the full content of a blob
    async fn download(&self, name: &str) -> Result<Vec<u8>>;

    /// Fetch a blob into a local file
    async fn download_to(&self, name: &str, path: &Path) -> Result<()> {
        let data = self.download(name).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    /// URI of a blob (for logging)
    fn uri(&self, name: &str) -> String;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
