//! Vector index and retriever

pub mod retriever;
pub mod search;

pub use retriever::Retriever;
pub use search::{SearchResult, VectorIndex};
