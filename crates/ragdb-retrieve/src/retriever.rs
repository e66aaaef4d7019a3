use anyhow::anyhow;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use ragdb_core::config::validate_k;
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::VectorIndex;
use ragdb_core::types::{Chunk, ScoredChunk};
use ragdb_embed::SharedEmbedder;

/// Query facade over one built index and the embedder that built it.
///
/// Provider failures come back as `Error::Retrieval`; a dimension conflict
/// between query and index stays `Error::DimensionMismatch`. Nothing is
/// retried here.
pub struct Retriever<I: ?Sized> {
    index: Arc<I>,
    embedder: SharedEmbedder,
    timeout: Option<Duration>,
}

impl<I> Clone for Retriever<I>
where
    I: ?Sized,
{
    fn clone(&self) -> Self {
        Self { index: self.index.clone(), embedder: self.embedder.clone(), timeout: self.timeout }
    }
}

impl<I> Retriever<I>
where
    I: VectorIndex + ?Sized + 'static,
{
    /// Fails with `InvalidConfig` when `embedder` is not the provider the index was built with.
    pub fn new(index: Arc<I>, embedder: SharedEmbedder) -> Result<Self> {
        if embedder.embedder_id() != index.embedder_id() {
            return Err(Error::InvalidConfig(format!(
                "index was built with embedder {}, queries would use {}",
                index.embedder_id(),
                embedder.embedder_id()
            )));
        }
        Ok(Self { index, embedder, timeout: None })
    }

    /// Deadline for embedding the query. An expired deadline is a retrieval failure.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn index(&self) -> &Arc<I> {
        &self.index
    }

    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        Ok(self.retrieve_scored(query, k).await?.into_iter().map(|s| s.chunk).collect())
    }

    pub async fn retrieve_scored(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        validate_k(k)?;
        let vector = self.embed_query(query).await?;
        if vector.len() != self.index.dim() {
            return Err(Error::DimensionMismatch { expected: self.index.dim(), actual: vector.len() });
        }
        let index = self.index.clone();
        let hits = tokio::task::spawn_blocking(move || index.search(&vector, k))
            .await
            .map_err(|e| Error::Retrieval(anyhow!("search task failed: {e}")))??;
        debug!(k, hits = hits.len(), best = ?hits.first().map(|h| h.distance), "retrieved");
        Ok(hits)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let embedder = self.embedder.clone();
        let text = query.to_string();
        let task = tokio::task::spawn_blocking(move || embedder.embed(&text));
        // The blocking call cannot be cancelled; on timeout its result is discarded.
        let joined = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| Error::Retrieval(anyhow!("query embedding timed out after {limit:?}")))?,
            None => task.await,
        };
        match joined {
            Ok(Ok(vector)) => Ok(vector),
            Ok(Err(e @ Error::DimensionMismatch { .. })) => Err(e),
            Ok(Err(e)) => Err(Error::Retrieval(anyhow::Error::new(e).context("embedding query"))),
            Err(e) => Err(Error::Retrieval(anyhow!("embedding task failed: {e}"))),
        }
    }
}

/// Chunk contents separated by blank lines, the context handed to answer synthesis.
pub fn join_context(chunks: &[Chunk]) -> String {
    chunks.iter().map(|c| c.content.as_str()).collect::<Vec<_>>().join("\n\n")
}
