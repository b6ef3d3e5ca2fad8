//! Local artifact store backed by a filesystem directory
//!
//! Stands in for the bucket during development and in tests.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::{Error, Result};

use super::artifact_store::ArtifactStore;

/// Directory of named blobs
pub struct LocalArtifactStore {
    /// Directory to store blobs in
    storage_dir: PathBuf,
}

impl LocalArtifactStore {
    /// Create a new local artifact store, creating the directory if needed
    pub fn new(storage_dir: impl Into<PathBuf>) -> Result<Self> {
        let storage_dir = storage_dir.into();
        std::fs::create_dir_all(&storage_dir)?;
        Ok(Self { storage_dir })
    }

    /// Get path for a blob
    fn blob_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
            return Err(Error::storage(format!("Invalid blob name: '{}'", name)));
        }
        Ok(self.storage_dir.join(name))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn upload(&self, name: &str, data: Vec<u8>) -> Result<String> {
        let path = self.blob_path(name)?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| Error::storage(format!("Failed to write {}: {}", path.display(), e)))?;
        Ok(path.to_string_lossy().to_string())
    }

    async fn download(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.blob_path(name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::storage(format!("Failed to read {}: {}", path.display(), e)))
    }

    fn uri(&self, name: &str) -> String {
        self.storage_dir.join(name).to_string_lossy().to_string()
    }

    fn name(&self) -> &str {
        "local-filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_then_download_to_scratch() {
        let bucket = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(bucket.path()).unwrap();

        let uri = store.upload("blob.bin", vec![1, 2, 3]).await.unwrap();
        assert!(uri.ends_with("blob.bin"));

        let target = scratch.path().join("nested").join("blob.bin");
        store.download_to("blob.bin", &target).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_missing_blob_is_storage_error() {
        let bucket = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(bucket.path()).unwrap();

        let err = store.download("absent.bin").await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[tokio::test]
    async fn test_rejects_path_like_names() {
        let bucket = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(bucket.path()).unwrap();

        assert!(store.upload("../escape.bin", vec![0]).await.is_err());
        assert!(store.download("").await.is_err());
    }
}
