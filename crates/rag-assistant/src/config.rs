//! Configuration for the RAG system
//!
//! Values come from three layers, later layers winning:
//! 1. `Default` impls below
//! 2. an optional TOML file named by `RAG_CONFIG`
//! 3. environment variables (`GCP_PROJECT`, `GCP_REGION`, `GCS_DATA_BUCKET`,
//!    `PORT`, `RAG_BACKEND`, `RAG_SCRATCH_DIR`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default GCP project when `GCP_PROJECT` is unset
pub const DEFAULT_PROJECT_ID: &str = "new-rag-project-prod";
/// Default GCP region when `GCP_REGION` is unset
pub const DEFAULT_REGION: &str = "europe-west1";

/// Main RAG system configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RagConfig {
    /// Backend provider (gcp or local)
    pub backend: BackendProvider,
    /// GCP project, region and bucket
    pub gcp: GcpConfig,
    /// Model names and sampling
    pub models: ModelConfig,
    /// Persisted artifact layout
    pub artifact: ArtifactConfig,
    /// Retriever settings
    pub retrieval: RetrievalConfig,
    /// Index builder settings
    pub indexing: IndexingConfig,
    /// HTTP server
    pub server: ServerConfig,
    /// Chat client
    pub client: ClientConfig,
    /// Local Ollama backend
    pub ollama: OllamaConfig,
}

impl RagConfig {
    /// Load defaults, then `RAG_CONFIG` (if set), then environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("RAG_CONFIG") {
            Ok(path) if !path.is_empty() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Apply environment overrides using the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(project) = lookup("GCP_PROJECT") {
            self.gcp.project_id = project;
        }
        if let Some(region) = lookup("GCP_REGION") {
            self.gcp.location = region;
        }
        if let Some(bucket) = lookup("GCS_DATA_BUCKET") {
            self.gcp.bucket = Some(bucket);
        }
        if let Some(key_path) = lookup("GOOGLE_APPLICATION_CREDENTIALS") {
            self.gcp.service_account_key_path = Some(PathBuf::from(key_path));
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid PORT '{}': {}", port, e)))?;
        }
        if let Some(backend) = lookup("RAG_BACKEND") {
            self.backend = match backend.to_lowercase().as_str() {
                "gcp" => BackendProvider::Gcp,
                "local" => BackendProvider::Local,
                other => {
                    return Err(Error::Config(format!(
                        "Unknown RAG_BACKEND '{}' (expected gcp or local)",
                        other
                    )))
                }
            };
        }
        if let Some(dir) = lookup("RAG_SCRATCH_DIR") {
            self.artifact.scratch_dir = PathBuf::from(dir);
        }
        Ok(())
    }
}

/// Backend provider selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// Google Cloud Platform (Vertex AI + Gemini + GCS)
    #[default]
    Gcp,
    /// Local backend (Ollama + filesystem directory as bucket)
    Local,
}

/// Google Cloud Platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GcpConfig {
    /// GCP project ID
    pub project_id: String,
    /// GCP region (e.g., "europe-west1")
    pub location: String,
    /// Bucket holding the artifact; derived from the project when unset
    pub bucket: Option<String>,
    /// Path to a service account JSON key. When unset the metadata server
    /// of the hosting platform issues tokens.
    pub service_account_key_path: Option<PathBuf>,
}

impl Default for GcpConfig {
    fn default() -> Self {
        Self {
            project_id: DEFAULT_PROJECT_ID.to_string(),
            location: DEFAULT_REGION.to_string(),
            bucket: None,
            service_account_key_path: None,
        }
    }
}

impl GcpConfig {
    /// Bucket name, `rag-data-bucket-<project>` unless overridden
    pub fn bucket_name(&self) -> String {
        self.bucket
            .clone()
            .unwrap_or_else(|| format!("rag-data-bucket-{}", self.project_id))
    }
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Embedding model (summaries and queries)
    pub embedding_model: String,
    /// Answer generation model
    pub generation_model: String,
    /// Summarization model used by the index builder
    pub summary_model: String,
    /// Sampling temperature for answers
    pub temperature: f32,
    /// Sampling temperature for summaries
    pub summary_temperature: f32,
    /// Output token cap for generation calls
    pub max_output_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding_model: "gemini-embedding-001".to_string(),
            generation_model: "gemini-2.5-pro".to_string(),
            summary_model: "gemini-2.5-flash".to_string(),
            temperature: 0.2,
            summary_temperature: 0.0,
            max_output_tokens: 8192,
        }
    }
}

/// Persisted artifact layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Blob holding the serialized embedding sequence
    pub embeddings_blob: String,
    /// Blob holding the serialized original text sequence
    pub texts_blob: String,
    /// Local scratch directory the server downloads blobs into
    pub scratch_dir: PathBuf,
    /// Directory standing in for the bucket on the local backend
    pub local_store_dir: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            embeddings_blob: "summary_embeddings.bin".to_string(),
            texts_blob: "original_texts.bin".to_string(),
            scratch_dir: std::env::temp_dir(),
            local_store_dir: PathBuf::from("rag-data"),
        }
    }
}

/// Retriever configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Passages handed to the prompt per query
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// Index builder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Default document source (URL or path)
    pub source: String,
    /// Concurrent summarization requests
    pub summary_concurrency: usize,
    /// Texts per embedding request
    pub embedding_batch_size: usize,
    /// Maximum characters per unit for plain-text sources
    pub unit_size: usize,
    /// Timeout for fetching a remote source, in seconds
    pub fetch_timeout_secs: u64,
    /// Limit on PDF text extraction, in seconds
    pub extract_timeout_secs: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            source: "https://arxiv.org/pdf/1706.03762.pdf".to_string(),
            summary_concurrency: 8,
            // gemini-embedding-001 accepts one instance per predict call
            embedding_batch_size: 1,
            unit_size: 4000,
            fetch_timeout_secs: 120,
            extract_timeout_secs: 60,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

/// Chat client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Query server URL
    pub endpoint: String,
    /// Upper bound on a single request, in seconds
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: crate::client::DEFAULT_API_URL.to_string(),
            timeout_secs: 300,
        }
    }
}

/// Ollama configuration for the local backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "llama3.2:3b".to_string(),
            timeout_secs: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.backend, BackendProvider::Gcp);
        assert_eq!(config.gcp.project_id, "new-rag-project-prod");
        assert_eq!(config.gcp.location, "europe-west1");
        assert_eq!(
            config.gcp.bucket_name(),
            "rag-data-bucket-new-rag-project-prod"
        );
        assert_eq!(config.models.temperature, 0.2);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.client.timeout_secs, 300);
    }

    #[test]
    fn test_bucket_follows_project() {
        let mut config = RagConfig::default();
        config.apply_env(lookup(&[("GCP_PROJECT", "demo")])).unwrap();
        assert_eq!(config.gcp.bucket_name(), "rag-data-bucket-demo");

        config
            .apply_env(lookup(&[("GCS_DATA_BUCKET", "explicit")]))
            .unwrap();
        assert_eq!(config.gcp.bucket_name(), "explicit");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RagConfig::default();
        config
            .apply_env(lookup(&[
                ("PORT", "9090"),
                ("RAG_BACKEND", "local"),
                ("GCP_REGION", "us-central1"),
            ]))
            .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.backend, BackendProvider::Local);
        assert_eq!(config.gcp.location, "us-central1");
    }

    #[test]
    fn test_invalid_env_rejected() {
        let mut config = RagConfig::default();
        assert!(config.apply_env(lookup(&[("PORT", "eighty")])).is_err());
        assert!(config.apply_env(lookup(&[("RAG_BACKEND", "aws")])).is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: RagConfig = toml::from_str(
            r#"
            backend = "local"

            [retrieval]
            top_k = 2

            [gcp]
            project_id = "from-file"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend, BackendProvider::Local);
        assert_eq!(config.retrieval.top_k, 2);
        assert_eq!(config.gcp.project_id, "from-file");
        assert_eq!(config.gcp.location, "europe-west1");
        assert_eq!(config.artifact.texts_blob, "original_texts.bin");
    }
}
