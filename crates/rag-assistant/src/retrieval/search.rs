//! In-memory vector index over summary embeddings
//!
//! Exact (brute-force) cosine nearest-neighbour search. Rows are
//! L2-normalized at build time so a query is one matrix-vector product.

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::artifact::PersistedArtifact;
use crate::error::{Error, Result};

/// Search result with text and similarity
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Position of the passage in the artifact
    pub position: usize,
    /// Original text associated with the matched embedding
    pub text: String,
    /// Cosine similarity (-1.0 to 1.0, higher is more similar)
    pub similarity: f32,
}

/// Read-only vector index rebuilt from the artifact on every cold start
#[derive(Debug, Clone)]
pub struct VectorIndex {
    /// One normalized embedding per row
    matrix: Array2<f32>,
    /// Text for each row
    texts: Vec<String>,
}

fn normalize(mut v: Array1<f32>) -> Array1<f32> {
    let norm = v.dot(&v).sqrt();
    if norm > f32::EPSILON {
        v /= norm;
    }
    v
}

impl VectorIndex {
    /// Build the index, associating each vector with its original text
    pub fn build(artifact: PersistedArtifact) -> Result<Self> {
        let dims = artifact.dimensions().unwrap_or(0);
        let rows = artifact.len();

        let mut flat = Vec::with_capacity(rows * dims);
        let mut texts = Vec::with_capacity(rows);
        for passage in artifact.into_passages() {
            flat.extend(passage.embedding);
            texts.push(passage.text);
        }

        let mut matrix = Array2::from_shape_vec((rows, dims), flat)
            .map_err(|e| Error::artifact(format!("Invalid embedding matrix: {}", e)))?;

        for mut row in matrix.axis_iter_mut(Axis(0)) {
            let norm = row.dot(&row).sqrt();
            if norm > f32::EPSILON {
                row /= norm;
            }
        }

        Ok(Self { matrix, texts })
    }

    /// Number of indexed passages
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Embedding dimension (0 for an empty index)
    pub fn dimensions(&self) -> usize {
        self.matrix.ncols()
    }

    /// Return up to `top_k` passages ordered by descending similarity
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        if self.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        if query_embedding.len() != self.dimensions() {
            return Err(Error::embedding(format!(
                "Query embedding has dimension {}, index expects {}",
                query_embedding.len(),
                self.dimensions()
            )));
        }

        let query = normalize(ArrayView1::from(query_embedding).to_owned());
        let scores = self.matrix.dot(&query);

        let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
        // Stable sort keeps artifact order among equal scores
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(top_k);

        Ok(ranked
            .into_iter()
            .map(|(position, similarity)| SearchResult {
                position,
                text: self.texts[position].clone(),
                similarity,
            })
            .collect())
    }
}
