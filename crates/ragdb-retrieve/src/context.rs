use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use ragdb_core::config::{expand_path, RagConfig};
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::{RecordSource, VectorIndex};
use ragdb_core::types::{Chunk, ScoredChunk};
use ragdb_embed::{build_embedder, SharedEmbedder};
use ragdb_source::source_from_config;
use ragdb_vector::cache::content_hash;
use ragdb_vector::{load_snapshot, save_snapshot, ActiveIndex, BuildParams, EmbeddingCache, VectorStore};

use crate::pipeline::build_knowledge;
use crate::report::BuildReport;
use crate::retriever::{join_context, Retriever};
use crate::retry::RetryPolicy;

/// Owns everything a serving layer needs to answer queries.
///
/// Rebuilds construct a complete index off to the side and install it with
/// one pointer swap. Queries never wait on a rebuild; concurrent rebuilds
/// queue behind an async mutex.
pub struct KnowledgeBase {
    config: RagConfig,
    embedder: SharedEmbedder,
    source: Arc<dyn RecordSource>,
    active: ActiveIndex,
    cache: EmbeddingCache,
    report: RwLock<Option<Arc<BuildReport>>>,
    rebuild_lock: Mutex<()>,
    retry: RetryPolicy,
}

impl KnowledgeBase {
    pub fn new(config: RagConfig, embedder: SharedEmbedder, source: Arc<dyn RecordSource>) -> Result<Self> {
        config.validate()?;
        let cache = match config.build.cache_path.as_deref() {
            Some(p) => EmbeddingCache::load(&expand_path(p))?,
            None => EmbeddingCache::new(),
        };
        let retry = RetryPolicy::from(&config.build);
        Ok(Self {
            config,
            embedder,
            source,
            active: ActiveIndex::new(),
            cache,
            report: RwLock::new(None),
            rebuild_lock: Mutex::new(()),
            retry,
        })
    }

    /// Builds the embedder and record source named in `config`.
    pub fn from_config(config: RagConfig) -> Result<Self> {
        config.validate()?;
        let embedder = build_embedder(&config.embedder)?;
        let source = source_from_config(&config.source)?;
        Self::new(config, embedder, source)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn embedder(&self) -> &SharedEmbedder {
        &self.embedder
    }

    pub fn generation(&self) -> u64 {
        self.active.generation()
    }

    pub fn report(&self) -> Option<Arc<BuildReport>> {
        self.report.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn current_index(&self) -> Option<Arc<VectorStore>> {
        self.active.current()
    }

    fn snapshot_path(&self) -> Option<PathBuf> {
        self.config.index.snapshot_path.as_deref().map(expand_path)
    }

    /// Serves from the configured snapshot when it matches the embedder and
    /// the current chunking and index settings, otherwise builds from the
    /// record source. Returns the build report,
    /// or `None` when a snapshot was loaded.
    pub async fn initialize(&self) -> Result<Option<Arc<BuildReport>>> {
        if let Some(path) = self.snapshot_path().filter(|p| p.exists()) {
            let params = BuildParams::from_config(&self.config);
            match load_snapshot(&path, self.embedder.embedder_id(), self.embedder.dim(), &params) {
                Ok(store) => {
                    self.active.swap(store);
                    return Ok(None);
                }
                Err(e @ (Error::InvalidConfig(_) | Error::Snapshot(_))) => {
                    warn!("not using snapshot {}: {e}", path.display());
                }
                Err(e) => return Err(e),
            }
        }
        self.rebuild().await.map(Some)
    }

    /// Rebuilds from the record source and swaps the new index in.
    ///
    /// Transient source or provider failures are retried per the retry
    /// policy. On failure the previously active index keeps serving.
    pub async fn rebuild(&self) -> Result<Arc<BuildReport>> {
        let _guard = self.rebuild_lock.lock().await;
        let output = self
            .retry
            .run("index build", || {
                build_knowledge(self.source.as_ref(), self.embedder.clone(), &self.config, Some(&self.cache))
            })
            .await?;

        let live: Vec<String> = output.index.entries().iter().map(|e| content_hash(&e.chunk.content)).collect();
        let evicted = self.cache.retain_only(self.embedder.embedder_id(), &live);
        if evicted > 0 {
            debug!(evicted, "pruned embedding cache to the current corpus");
        }

        let report = Arc::new(output.report);
        self.active.swap(output.index);
        *self.report.write().unwrap_or_else(PoisonError::into_inner) = Some(report.clone());
        info!(documents = report.documents, chunks = report.chunks, "knowledge base rebuilt");

        if let (Some(path), Some(store)) = (self.snapshot_path(), self.active.current()) {
            if let Err(e) = save_snapshot(&store, &BuildParams::from_config(&self.config), &path) {
                warn!("failed to save snapshot to {}: {e}", path.display());
            }
        }
        if let Some(path) = self.config.build.cache_path.as_deref().map(expand_path) {
            if let Err(e) = self.cache.save(&path) {
                warn!("failed to save embedding cache to {}: {e}", path.display());
            }
        }
        Ok(report)
    }

    /// Retriever bound to the index active right now. Fails with
    /// `EmptyCorpus` before the first successful build.
    pub fn retriever(&self) -> Result<Retriever<VectorStore>> {
        let index = self.active.current().ok_or(Error::EmptyCorpus)?;
        Ok(Retriever::new(index, self.embedder.clone())?.with_timeout(self.config.retrieval.query_timeout()))
    }

    /// Top-k chunks for `query`; `k` defaults to the configured value.
    pub async fn retrieve(&self, query: &str, k: Option<usize>) -> Result<Vec<Chunk>> {
        self.retriever()?.retrieve(query, k.unwrap_or(self.config.retrieval.k)).await
    }

    pub async fn retrieve_scored(&self, query: &str, k: Option<usize>) -> Result<Vec<ScoredChunk>> {
        self.retriever()?.retrieve_scored(query, k.unwrap_or(self.config.retrieval.k)).await
    }

    /// Retrieved context for answer synthesis. Failures are returned, not
    /// replaced by an empty context.
    pub async fn context_for(&self, query: &str) -> Result<String> {
        Ok(join_context(&self.retrieve(query, None).await?))
    }

    pub fn index_len(&self) -> usize {
        self.active.current().map_or(0, |i| i.len())
    }
}
