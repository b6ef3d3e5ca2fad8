//! Persisted index artifact
//!
//! The artifact is stored as two blobs: the summary embeddings and the
//! original unit texts, aligned by position. In memory each embedding is
//! paired with its text in an [`IndexedPassage`], so misalignment can only
//! happen at the blob boundary, where it is rejected on load.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::ArtifactConfig;
use crate::error::{Error, Result};
use crate::providers::ArtifactStore;

/// One retrievable unit: the embedding of its summary and the original text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedPassage {
    /// Embedding of the model-generated summary
    pub embedding: Vec<f32>,
    /// Original (pre-summary) text returned as context
    pub text: String,
}

/// Durable output of the index builder, input of the query server
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedArtifact {
    passages: Vec<IndexedPassage>,
}

/// Where an artifact was written
#[derive(Debug, Clone)]
pub struct ArtifactLocation {
    pub embeddings_uri: String,
    pub texts_uri: String,
}

fn bincode_config() -> bincode::config::Configuration {
    bincode::config::standard()
}

impl PersistedArtifact {
    /// Pair embeddings with texts by position
    ///
    /// Fails when the sequences differ in length or the vectors differ in
    /// dimension.
    pub fn from_parts(embeddings: Vec<Vec<f32>>, texts: Vec<String>) -> Result<Self> {
        if embeddings.len() != texts.len() {
            return Err(Error::artifact(format!(
                "{} embeddings but {} texts",
                embeddings.len(),
                texts.len()
            )));
        }

        if let Some(first) = embeddings.first() {
            let dims = first.len();
            if dims == 0 {
                return Err(Error::artifact("embedding vectors are empty"));
            }
            if let Some(pos) = embeddings.iter().position(|e| e.len() != dims) {
                return Err(Error::artifact(format!(
                    "embedding {} has dimension {}, expected {}",
                    pos,
                    embeddings[pos].len(),
                    dims
                )));
            }
        }

        let passages = embeddings
            .into_iter()
            .zip(texts)
            .map(|(embedding, text)| IndexedPassage { embedding, text })
            .collect();

        Ok(Self { passages })
    }

    /// Passages in artifact order
    pub fn passages(&self) -> &[IndexedPassage] {
        &self.passages
    }

    /// Consume into passages
    pub fn into_passages(self) -> Vec<IndexedPassage> {
        self.passages
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Embedding dimension, `None` for an empty artifact
    pub fn dimensions(&self) -> Option<usize> {
        self.passages.first().map(|p| p.embedding.len())
    }

    /// Serialize into (embeddings blob, texts blob)
    pub fn encode_blobs(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        let embeddings: Vec<&Vec<f32>> = self.passages.iter().map(|p| &p.embedding).collect();
        let texts: Vec<&String> = self.passages.iter().map(|p| &p.text).collect();

        let embeddings_blob = bincode::serde::encode_to_vec(&embeddings, bincode_config())?;
        let texts_blob = bincode::serde::encode_to_vec(&texts, bincode_config())?;
        Ok((embeddings_blob, texts_blob))
    }

    /// Deserialize from (embeddings blob, texts blob)
    pub fn decode_blobs(embeddings_blob: &[u8], texts_blob: &[u8]) -> Result<Self> {
        let (embeddings, _): (Vec<Vec<f32>>, usize) =
            bincode::serde::decode_from_slice(embeddings_blob, bincode_config())?;
        let (texts, _): (Vec<String>, usize) =
            bincode::serde::decode_from_slice(texts_blob, bincode_config())?;
        Self::from_parts(embeddings, texts)
    }

    /// Upload both blobs
    ///
    /// Both blobs are encoded before anything is written. The store has no
    /// multi-blob transaction: if the texts upload fails after the embeddings
    /// upload succeeded, the store holds new embeddings next to old texts and
    /// must be rebuilt. That case is logged and returned as a storage error
    /// naming both blobs.
    pub async fn persist(
        &self,
        store: &dyn ArtifactStore,
        config: &ArtifactConfig,
    ) -> Result<ArtifactLocation> {
        let (embeddings_blob, texts_blob) = self.encode_blobs()?;

        let embeddings_uri = store.upload(&config.embeddings_blob, embeddings_blob).await?;
        let texts_uri = store
            .upload(&config.texts_blob, texts_blob)
            .await
            .map_err(|e| {
                tracing::error!(
                    "{} was replaced but {} was not; rerun the index build: {}",
                    embeddings_uri,
                    store.uri(&config.texts_blob),
                    e
                );
                Error::storage(format!(
                    "{} is out of step with {}: {}",
                    config.embeddings_blob, config.texts_blob, e
                ))
            })?;

        tracing::info!(
            "Persisted {} passages to {} and {}",
            self.len(),
            embeddings_uri,
            texts_uri
        );

        Ok(ArtifactLocation {
            embeddings_uri,
            texts_uri,
        })
    }

    /// Write both blobs into a local directory
    pub async fn write_to_dir(
        &self,
        dir: &Path,
        config: &ArtifactConfig,
    ) -> Result<ArtifactLocation> {
        let (embeddings_blob, texts_blob) = self.encode_blobs()?;
        tokio::fs::create_dir_all(dir).await?;

        let embeddings_path = dir.join(&config.embeddings_blob);
        let texts_path = dir.join(&config.texts_blob);
        tokio::fs::write(&embeddings_path, embeddings_blob).await?;
        tokio::fs::write(&texts_path, texts_blob).await?;

        Ok(ArtifactLocation {
            embeddings_uri: embeddings_path.to_string_lossy().to_string(),
            texts_uri: texts_path.to_string_lossy().to_string(),
        })
    }

    /// Download both blobs into the scratch directory and load them
    pub async fn fetch(store: &dyn ArtifactStore, config: &ArtifactConfig) -> Result<Self> {
        let embeddings_path = scratch_path(config, &config.embeddings_blob);
        let texts_path = scratch_path(config, &config.texts_blob);

        store
            .download_to(&config.embeddings_blob, &embeddings_path)
            .await?;
        store.download_to(&config.texts_blob, &texts_path).await?;
        tracing::info!("Downloaded index files from {}", store.name());

        let embeddings_blob = tokio::fs::read(&embeddings_path).await?;
        let texts_blob = tokio::fs::read(&texts_path).await?;
        let artifact = Self::decode_blobs(&embeddings_blob, &texts_blob)?;
        tracing::info!("Loaded {} passages into memory", artifact.len());

        Ok(artifact)
    }
}

fn scratch_path(config: &ArtifactConfig, blob: &str) -> PathBuf {
    config.scratch_dir.join(blob)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::local::LocalArtifactStore;
    use crate::providers::testing::MemoryArtifactStore;
    use std::sync::atomic::Ordering;

    fn sample() -> PersistedArtifact {
        PersistedArtifact::from_parts(
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            vec!["first page".to_string(), "second page".to_string()],
        )
        .unwrap()
    }

    fn config_with_scratch(dir: &Path) -> ArtifactConfig {
        ArtifactConfig {
            scratch_dir: dir.to_path_buf(),
            ..ArtifactConfig::default()
        }
    }

    #[test]
    fn test_pairs_by_position() {
        let artifact = sample();
        assert_eq!(artifact.len(), 2);
        assert_eq!(artifact.dimensions(), Some(2));
        assert_eq!(artifact.passages()[1].text, "second page");
        assert_eq!(artifact.passages()[1].embedding, vec![0.0, 1.0]);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = PersistedArtifact::from_parts(vec![vec![1.0]], vec![]).unwrap_err();
        assert!(matches!(err, Error::Artifact(_)));
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let err = PersistedArtifact::from_parts(
            vec![vec![1.0, 0.0], vec![1.0]],
            vec!["a".into(), "b".into()],
        )
        .unwrap_err();
        assert!(err.to_string().contains("embedding 1"));
    }

    #[test]
    fn test_empty_artifact_is_valid() {
        let artifact = PersistedArtifact::from_parts(vec![], vec![]).unwrap();
        assert!(artifact.is_empty());
        assert_eq!(artifact.dimensions(), None);

        let (e, t) = artifact.encode_blobs().unwrap();
        assert!(PersistedArtifact::decode_blobs(&e, &t).unwrap().is_empty());
    }

    #[test]
    fn test_garbage_blob_is_artifact_error() {
        let (_, texts) = sample().encode_blobs().unwrap();
        let err = PersistedArtifact::decode_blobs(&[0xff, 0xff, 0xff], &texts).unwrap_err();
        assert!(matches!(err, Error::Artifact(_)));
    }

    #[test]
    fn test_swapped_blobs_do_not_load_silently() {
        let (embeddings, texts) = sample().encode_blobs().unwrap();
        assert!(PersistedArtifact::decode_blobs(&texts, &embeddings).is_err());
    }

    #[tokio::test]
    async fn test_persist_then_fetch_via_scratch() {
        let bucket = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(bucket.path()).unwrap();
        let config = config_with_scratch(scratch.path());

        let location = sample().persist(&store, &config).await.unwrap();
        assert!(location.embeddings_uri.ends_with("summary_embeddings.bin"));
        assert!(location.texts_uri.ends_with("original_texts.bin"));

        let loaded = PersistedArtifact::fetch(&store, &config).await.unwrap();
        assert_eq!(loaded, sample());
        assert!(scratch.path().join("original_texts.bin").exists());
    }

    #[tokio::test]
    async fn test_fetch_surfaces_download_failure() {
        let scratch = tempfile::tempdir().unwrap();
        let store = MemoryArtifactStore::default();
        store.fail_downloads.store(true, Ordering::SeqCst);

        let err = PersistedArtifact::fetch(&store, &config_with_scratch(scratch.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[tokio::test]
    async fn test_failed_texts_upload_reports_both_blobs() {
        let store = MemoryArtifactStore::default();
        let config = ArtifactConfig::default();
        *store.fail_uploads_of.lock() = Some(config.texts_blob.clone());

        let err = sample().persist(&store, &config).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        let message = err.to_string();
        assert!(message.contains(&config.embeddings_blob));
        assert!(message.contains(&config.texts_blob));
        assert!(message.contains("simulated outage"));

        let blobs = store.blobs.lock();
        assert!(blobs.contains_key(&config.embeddings_blob));
        assert!(!blobs.contains_key(&config.texts_blob));
    }

    #[tokio::test]
    async fn test_write_to_dir() {
        let out = tempfile::tempdir().unwrap();
        let config = ArtifactConfig::default();
        sample().write_to_dir(out.path(), &config).await.unwrap();

        let e = std::fs::read(out.path().join(&config.embeddings_blob)).unwrap();
        let t = std::fs::read(out.path().join(&config.texts_blob)).unwrap();
        assert_eq!(PersistedArtifact::decode_blobs(&e, &t).unwrap(), sample());
    }
}
