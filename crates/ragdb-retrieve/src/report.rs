use serde::Serialize;
use std::fmt;

use ragdb_core::config::{IndexKind, RetrievalParams};
use ragdb_core::metric::Metric;

/// What a build loaded and how the resulting index is parameterized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildReport {
    pub keys: Vec<String>,
    pub skipped_collections: Vec<String>,
    /// Rendered errors for records and collections that were skipped.
    pub record_errors: Vec<String>,
    pub records: usize,
    pub documents: usize,
    pub chunks: usize,
    pub cache_hits: usize,
    pub embedded: usize,
    pub embedder_id: String,
    pub dim: usize,
    pub metric: Metric,
    pub index_kind: IndexKind,
    pub k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub memory: usize,
}

impl BuildReport {
    pub(crate) fn with_params(mut self, params: &RetrievalParams) -> Self {
        self.k = params.k;
        self.chunk_size = params.chunk_size;
        self.chunk_overlap = params.chunk_overlap;
        self.memory = params.memory;
        self
    }

    /// Display lines: one per loaded key, then the retrieval parameters.
    pub fn lines(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .keys
            .iter()
            .map(|k| if self.skipped_collections.contains(k) { format!("{k} (skipped)") } else { k.clone() })
            .collect();
        out.push(format!(
            "Indexed {} documents as {} chunks ({} {:?} index, {} dims, {})",
            self.documents, self.chunks, self.metric, self.index_kind, self.dim, self.embedder_id
        ));
        if !self.record_errors.is_empty() {
            out.push(format!("Skipped {} malformed records", self.record_errors.len()));
        }
        out.push("RAG Parameters: ".to_string());
        out.push(format!("Top-k value: {}", self.k));
        out.push(format!("Chunk size: {}", self.chunk_size));
        out.push(format!("Chunk overlap: {}", self.chunk_overlap));
        out.push(format!("Memory: {}", self.memory));
        out
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
