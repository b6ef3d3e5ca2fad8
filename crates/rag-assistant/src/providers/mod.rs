//! Provider abstractions for embeddings, LLM, and artifact storage
//!
//! This module provides trait-based abstractions that allow switching between
//! local (Ollama + filesystem) and cloud (GCP) backends.

pub mod artifact_store;
pub mod backend;
pub mod embedding;
pub mod llm;
pub mod local;
pub mod ollama;

#[cfg(feature = "gcp")]
pub mod gcp;

#[cfg(test)]
pub(crate) mod testing;

pub use artifact_store::ArtifactStore;
pub use backend::Providers;
pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
