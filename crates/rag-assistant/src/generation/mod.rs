//! Prompt templating and the cached answer pipeline

pub mod cache;
pub mod pipeline;
pub mod prompt;

pub use cache::{ArtifactPipelineLoader, PipelineCache, PipelineLoader};
pub use pipeline::RagPipeline;
pub use prompt::{PromptBuilder, PromptTemplate, RAG_TEMPLATE, SUMMARY_TEMPLATE};
