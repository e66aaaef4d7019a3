use std::sync::Arc;

use ragdb_core::chunker::{build_chunker, chunk_all, ChunkerKind, ChunkingConfig};
use ragdb_core::config::{IndexConfig, IndexKind};
use ragdb_core::metric::Metric;
use ragdb_core::traits::{Embedder, VectorIndex};
use ragdb_core::types::{Document, Provenance};
use ragdb_embed::{HashEmbedder, SharedEmbedder};
use ragdb_vector::{build_index, embed_chunks, load_snapshot, save_snapshot, BuildParams, EmbedOptions, EmbeddingCache};
use tempfile::TempDir;

fn corpus() -> Vec<Document> {
    let topics = [
        ("fire", "Fire safety: keep an extinguisher near the stove. Check smoke alarms monthly."),
        ("water", "Water storage: rotate barrels every six months and keep a filter on hand."),
        ("garden", "Garden notes: tomatoes need full sun, beans fix nitrogen, rotate beds yearly."),
        ("power", "Power: the solar array charges the battery bank; the generator is a backup."),
    ];
    topics
        .iter()
        .map(|(key, text)| Document { text: text.repeat(3), metadata: Provenance::new(*key, "manual") })
        .collect()
}

#[tokio::test]
async fn chunk_embed_index_snapshot_search() {
    let chunker = build_chunker(ChunkerKind::Structured, ChunkingConfig::new(80, 10).expect("config")).expect("chunker");
    let chunks = chunk_all(chunker.as_ref(), &corpus());
    assert!(chunks.len() > 4);

    let hash = HashEmbedder::new(256).expect("dim");
    let embedder: SharedEmbedder = Arc::new(hash.clone());
    let cache = EmbeddingCache::new();
    let (embedded, stats) = embed_chunks(embedder.clone(), chunks, Some(&cache), EmbedOptions::default())
        .await
        .expect("embed");
    assert_eq!(stats.embedded, embedded.len());

    let flat = build_index(&IndexConfig::default(), embedder.embedder_id(), embedded.clone()).expect("flat");
    let ivf_config = IndexConfig { kind: IndexKind::Ivf, nprobe: 64, ..Default::default() };
    let ivf = build_index(&ivf_config, embedder.embedder_id(), embedded).expect("ivf");

    let q = hash.embed_text("smoke alarms and extinguisher");
    let top = flat.search(&q, 3).expect("search");
    assert_eq!(top[0].chunk.metadata.id, "fire");
    assert!(top.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert_eq!(ivf.search(&q, 3).expect("ivf search"), top);

    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("snapshot.json");
    let params = BuildParams {
        chunk_size: 80,
        chunk_overlap: 10,
        chunker: ChunkerKind::Structured,
        kind: IndexKind::Ivf,
        metric: Metric::SquaredL2,
        nlist: None,
        nprobe: 64,
    };
    save_snapshot(&ivf, &params, &path).expect("save");
    let reloaded = load_snapshot(&path, embedder.embedder_id(), embedder.dim(), &params).expect("load");
    assert_eq!(reloaded.search(&q, 3).expect("reloaded"), top);
    assert_eq!(reloaded.metric(), Metric::SquaredL2);

    let fewer_probes = BuildParams { nprobe: 4, ..params };
    assert!(load_snapshot(&path, embedder.embedder_id(), embedder.dim(), &fewer_probes).is_err());
}

#[tokio::test]
async fn k_larger_than_corpus_returns_everything() {
    let embedder: SharedEmbedder = Arc::new(HashEmbedder::new(64).expect("dim"));
    let chunker = build_chunker(ChunkerKind::Fixed, ChunkingConfig::new(1000, 0).expect("config")).expect("chunker");
    let chunks = chunk_all(chunker.as_ref(), &corpus());
    let (embedded, _) = embed_chunks(embedder.clone(), chunks, None, EmbedOptions::default()).await.expect("embed");
    let index = build_index(&IndexConfig::default(), embedder.embedder_id(), embedded).expect("index");
    let q = embedder.embed("anything").expect("embed");
    assert_eq!(index.search(&q, 50).expect("search").len(), 4);
}
