//! Offline index construction

pub mod builder;
pub mod loader;

pub use builder::{BuildReport, BuildTarget, IndexBuilder};
pub use loader::{DocumentLoader, SourceFormat};
