use tracing::debug;

use ragdb_core::error::{Error, Result};
use ragdb_core::metric::Metric;
use ragdb_core::traits::VectorIndex;
use ragdb_core::types::{EmbeddedChunk, ScoredChunk};

use crate::search::{check_query_dim, materialize, score_positions, top_k};

/// Exhaustive index: every query is scored against every stored vector.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    pub(crate) entries: Vec<EmbeddedChunk>,
    pub(crate) dim: usize,
    pub(crate) metric: Metric,
    pub(crate) embedder_id: String,
}

impl FlatIndex {
    /// Fails with `EmptyCorpus` on no input and `DimensionMismatch` when the
    /// vectors do not share the first vector's dimension.
    pub fn build(embedder_id: impl Into<String>, metric: Metric, entries: Vec<EmbeddedChunk>) -> Result<Self> {
        let dim = validate_entries(&entries)?;
        debug!(n = entries.len(), dim, %metric, "flat index built");
        Ok(Self { entries, dim, metric, embedder_id: embedder_id.into() })
    }

    pub fn entries(&self) -> &[EmbeddedChunk] {
        &self.entries
    }
}

/// Shared build precondition for every index kind; returns the dimension.
pub(crate) fn validate_entries(entries: &[EmbeddedChunk]) -> Result<usize> {
    let first = entries.first().ok_or(Error::EmptyCorpus)?;
    let dim = first.vector.len();
    if dim == 0 {
        return Err(Error::InvalidConfig("embedding vectors must not be empty".into()));
    }
    if let Some(bad) = entries.iter().find(|e| e.vector.len() != dim) {
        return Err(Error::DimensionMismatch { expected: dim, actual: bad.vector.len() });
    }
    Ok(dim)
}

impl VectorIndex for FlatIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn embedder_id(&self) -> &str {
        &self.embedder_id
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        check_query_dim(self.dim, query)?;
        let scored = score_positions(self.metric, &self.entries, query, 0..self.entries.len());
        Ok(materialize(&self.entries, top_k(scored, k)))
    }
}
