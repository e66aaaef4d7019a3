//! Build-time embedding of chunks.
//!
//! Cache hits are reused, misses are embedded in batches on the blocking
//! pool with up to `concurrency` batches in flight. Results come back in
//! chunk order regardless of which batch finishes first.

use anyhow::anyhow;
use futures::{StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use ragdb_core::config::BuildConfig;
use ragdb_core::error::{Error, Result};
use ragdb_core::types::{Chunk, EmbeddedChunk};
use ragdb_embed::SharedEmbedder;

use crate::cache::{content_hash, CacheEntry, EmbeddingCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedOptions {
    pub batch_size: usize,
    pub concurrency: usize,
    pub show_progress: bool,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self { batch_size: 64, concurrency: 4, show_progress: false }
    }
}

impl From<&BuildConfig> for EmbedOptions {
    fn from(build: &BuildConfig) -> Self {
        Self {
            batch_size: build.batch_size.max(1),
            concurrency: build.embed_concurrency.max(1),
            show_progress: build.show_progress,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EmbedStats {
    pub cache_hits: usize,
    pub embedded: usize,
}

fn progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}

pub async fn embed_chunks(
    embedder: SharedEmbedder,
    chunks: Vec<Chunk>,
    cache: Option<&EmbeddingCache>,
    opts: EmbedOptions,
) -> Result<(Vec<EmbeddedChunk>, EmbedStats)> {
    let embedder_id = embedder.embedder_id().to_string();
    let hashes: Vec<String> = chunks.iter().map(|c| content_hash(&c.content)).collect();
    let cached = cache.map(|c| c.get_many(&embedder_id, &hashes)).unwrap_or_default();

    let mut vectors: Vec<Option<Vec<f32>>> = hashes.iter().map(|h| cached.get(h).cloned()).collect();
    let misses: Vec<usize> = (0..chunks.len()).filter(|&i| vectors[i].is_none()).collect();
    let stats = EmbedStats { cache_hits: chunks.len() - misses.len(), embedded: misses.len() };
    debug!(hits = stats.cache_hits, misses = stats.embedded, "embedding cache consulted");

    let pb = progress_bar(chunks.len(), opts.show_progress);
    pb.inc(stats.cache_hits as u64);

    let batches: Vec<Vec<usize>> = misses.chunks(opts.batch_size.max(1)).map(<[usize]>::to_vec).collect();
    let mut results = futures::stream::iter(batches)
        .map(|batch| {
            let embedder = embedder.clone();
            let texts: Vec<String> = batch.iter().map(|&i| chunks[i].content.clone()).collect();
            async move {
                let out = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
                    .await
                    .map_err(|e| Error::Provider(anyhow!("embedding task failed: {e}")))??;
                Ok::<_, Error>((batch, out))
            }
        })
        .buffered(opts.concurrency.max(1));

    let mut fresh = Vec::with_capacity(misses.len());
    while let Some((batch, out)) = results.try_next().await? {
        if out.len() != batch.len() {
            return Err(Error::Provider(anyhow!("provider returned {} vectors for {} inputs", out.len(), batch.len())));
        }
        pb.inc(batch.len() as u64);
        for (i, v) in batch.into_iter().zip(out) {
            fresh.push(CacheEntry { content_hash: hashes[i].clone(), embedder_id: embedder_id.clone(), vector: v.clone() });
            vectors[i] = Some(v);
        }
    }
    drop(results);
    pb.finish_and_clear();

    if let Some(cache) = cache {
        cache.put_many(fresh);
    }

    let embedded = chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| {
            vector
                .map(|vector| EmbeddedChunk { chunk, vector })
                .ok_or_else(|| Error::Provider(anyhow!("missing embedding")))
        })
        .collect::<Result<Vec<_>>>()?;
    info!(chunks = embedded.len(), cache_hits = stats.cache_hits, embedded = stats.embedded, "chunks embedded");
    Ok((embedded, stats))
}
