//! Google Cloud Platform provider implementations
//!
//! - Vertex AI gemini-embedding-001 for summary and query embeddings
//! - Gemini 2.5 for summaries and answers
//! - Google Cloud Storage for the persisted artifact

mod auth;
mod gcs_store;
mod gemini_client;
mod vertex_embedder;

pub use auth::GcpAuth;
pub use gcs_store::GcsArtifactStore;
pub use gemini_client::GeminiClient;
pub use vertex_embedder::VertexAiEmbedder;
