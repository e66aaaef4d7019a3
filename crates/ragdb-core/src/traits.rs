use async_trait::async_trait;

use crate::error::Result;
use crate::metric::Metric;
use crate::types::{Chunk, Document, Record, ScoredChunk};

/// Maps text to fixed-dimension vectors.
///
/// `embed_batch` must return exactly what calling `embed` once per item would;
/// batching is a throughput optimization only. Empty strings are valid input.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider and model (e.g. `hash:d384`).
    fn embedder_id(&self) -> &str;
    /// Dimension if already known, either configured or observed.
    fn dim(&self) -> Option<usize>;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed_batch(&[text.to_string()])?;
        out.pop().ok_or_else(|| {
            crate::error::Error::Provider(anyhow::anyhow!("provider returned no embedding"))
        })
    }
}

impl<E: Embedder + ?Sized> Embedder for std::sync::Arc<E> {
    fn embedder_id(&self) -> &str { (**self).embedder_id() }
    fn dim(&self) -> Option<usize> { (**self).dim() }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { (**self).embed_batch(texts) }
    fn embed(&self, text: &str) -> Result<Vec<f32>> { (**self).embed(text) }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn embedder_id(&self) -> &str { (**self).embedder_id() }
    fn dim(&self) -> Option<usize> { (**self).dim() }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { (**self).embed_batch(texts) }
    fn embed(&self, text: &str) -> Result<Vec<f32>> { (**self).embed(text) }
}

/// Splits a document into left-to-right windows that together cover every
/// character of its text.
pub trait Chunker: Send + Sync {
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// A built, immutable nearest-neighbour index.
pub trait VectorIndex: Send + Sync {
    fn dim(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool { self.len() == 0 }
    fn metric(&self) -> Metric;
    /// Provider identity the stored vectors were produced with.
    fn embedder_id(&self) -> &str;
    /// Up to `k` stored chunks ordered by ascending distance, ties broken by
    /// insertion order. `k` larger than the index is clamped.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;
}

/// Read-only access to the upstream record store.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// All collection keys, reserved configuration keys included.
    async fn list_keys(&self) -> Result<Vec<String>>;
    /// Records of one collection. `Ok(None)` means the collection lacks its
    /// payload marker and should be skipped.
    async fn fetch_collection(&self, key: &str) -> Result<Option<Vec<Record>>>;
}
