//! One full build: records -> documents -> chunks -> vectors -> index.
//!
//! The index is returned, never installed; callers decide when to swap it in.

use tracing::info;

use ragdb_core::chunker::{build_chunker, chunk_all};
use ragdb_core::config::RagConfig;
use ragdb_core::error::Result;
use ragdb_core::normalize::normalize_all;
use ragdb_core::traits::{RecordSource, VectorIndex};
use ragdb_embed::SharedEmbedder;
use ragdb_source::load_records;
use ragdb_vector::{build_index, embed_chunks, EmbedOptions, EmbeddingCache, VectorStore};

use crate::report::BuildReport;

pub struct BuildOutput {
    pub index: VectorStore,
    pub report: BuildReport,
}

pub async fn build_knowledge(
    source: &dyn RecordSource,
    embedder: SharedEmbedder,
    config: &RagConfig,
    cache: Option<&EmbeddingCache>,
) -> Result<BuildOutput> {
    config.validate()?;
    let chunker = build_chunker(config.retrieval.chunker, config.retrieval.chunking())?;
    let policy = config.build.failure_policy;

    let loaded = load_records(source, &config.source.excluded(), config.source.concurrency, policy).await?;
    let normalized = normalize_all(&loaded.records, policy)?;
    let chunks = chunk_all(chunker.as_ref(), &normalized.documents);
    info!(
        records = loaded.records.len(),
        documents = normalized.documents.len(),
        chunks = chunks.len(),
        "corpus prepared"
    );

    let n_chunks = chunks.len();
    let embedder_id = embedder.embedder_id().to_string();
    let (embedded, stats) = embed_chunks(embedder, chunks, cache, EmbedOptions::from(&config.build)).await?;
    let index = build_index(&config.index, &embedder_id, embedded)?;

    let record_errors: Vec<String> = loaded.errors.iter().chain(&normalized.errors).map(ToString::to_string).collect();
    let report = BuildReport {
        keys: loaded.keys,
        skipped_collections: loaded.skipped,
        record_errors,
        records: loaded.records.len(),
        documents: normalized.documents.len(),
        chunks: n_chunks,
        cache_hits: stats.cache_hits,
        embedded: stats.embedded,
        embedder_id,
        dim: index.dim(),
        metric: index.metric(),
        index_kind: index.kind(),
        k: 0,
        chunk_size: 0,
        chunk_overlap: 0,
        memory: 0,
    }
    .with_params(&config.retrieval);
    Ok(BuildOutput { index, report })
}
