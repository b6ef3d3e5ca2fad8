//! rag-assistant: summary-indexed retrieval-augmented question answering
//!
//! Three parts share this crate:
//! - an offline index builder that summarizes each document unit, embeds the
//!   summary, and persists the embeddings next to the original unit texts;
//! - a query server that loads that artifact once per process and answers
//!   `POST /` requests from the retrieved original texts;
//! - a chat client that keeps the conversation locally and sends one
//!   question per request.

pub mod artifact;
pub mod client;
pub mod config;
pub mod error;
pub mod generation;
pub mod indexing;
pub mod providers;
pub mod retrieval;
pub mod server;

pub use artifact::{IndexedPassage, PersistedArtifact};
pub use config::RagConfig;
pub use error::{Error, Result};
pub use generation::{PipelineCache, RagPipeline};
