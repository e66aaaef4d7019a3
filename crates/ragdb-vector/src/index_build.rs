//! Index construction from configuration.
//!
//! Typical flow:
//! 1) Embed chunks in order (`embed_chunks`), reusing cached vectors
//! 2) Compute IVF params from the corpus size when `kind = "ivf"`
//! 3) Build the index and hand it to `ActiveIndex::swap`

use tracing::info;

use ragdb_core::config::{IndexConfig, IndexKind};
use ragdb_core::error::Result;
use ragdb_core::metric::Metric;
use ragdb_core::traits::VectorIndex;
use ragdb_core::types::{EmbeddedChunk, ScoredChunk};

use crate::flat::FlatIndex;
use crate::ivf::{IvfIndex, IvfParams};

/// The index variants selectable from configuration.
#[derive(Debug, Clone)]
pub enum VectorStore {
    Flat(FlatIndex),
    Ivf(IvfIndex),
}

impl VectorStore {
    pub fn kind(&self) -> IndexKind {
        match self {
            VectorStore::Flat(_) => IndexKind::Flat,
            VectorStore::Ivf(_) => IndexKind::Ivf,
        }
    }

    pub fn entries(&self) -> &[EmbeddedChunk] {
        match self {
            VectorStore::Flat(f) => f.entries(),
            VectorStore::Ivf(i) => i.entries(),
        }
    }

    fn inner(&self) -> &dyn VectorIndex {
        match self {
            VectorStore::Flat(f) => f,
            VectorStore::Ivf(i) => i,
        }
    }
}

impl VectorIndex for VectorStore {
    fn dim(&self) -> usize {
        self.inner().dim()
    }

    fn len(&self) -> usize {
        self.inner().len()
    }

    fn metric(&self) -> Metric {
        self.inner().metric()
    }

    fn embedder_id(&self) -> &str {
        self.inner().embedder_id()
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        self.inner().search(query, k)
    }
}

/// `nlist` defaults to `round(sqrt(N))`; both values are clamped to `[1, N]`.
pub fn compute_ivf_params(total: usize, config: &IndexConfig) -> IvfParams {
    let sqrt_n = (total as f64).sqrt().round() as usize;
    let nlist = config.nlist.unwrap_or(sqrt_n).clamp(1, total.max(1));
    IvfParams { nlist, nprobe: config.nprobe.clamp(1, nlist) }
}

pub fn build_index(config: &IndexConfig, embedder_id: &str, entries: Vec<EmbeddedChunk>) -> Result<VectorStore> {
    let n = entries.len();
    let store = match config.kind {
        IndexKind::Flat => VectorStore::Flat(FlatIndex::build(embedder_id, config.metric, entries)?),
        IndexKind::Ivf => {
            let params = compute_ivf_params(n, config);
            VectorStore::Ivf(IvfIndex::build(embedder_id, config.metric, entries, params)?)
        }
    };
    info!(kind = ?store.kind(), n, dim = store.dim(), metric = %store.metric(), "index built");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::entry;
    use ragdb_core::error::Error;

    #[test]
    fn ivf_params_follow_corpus_size() {
        let config = IndexConfig { kind: IndexKind::Ivf, nlist: None, nprobe: 8, ..Default::default() };
        assert_eq!(compute_ivf_params(100, &config), IvfParams { nlist: 10, nprobe: 8 });
        assert_eq!(compute_ivf_params(2, &config), IvfParams { nlist: 1, nprobe: 1 });
        let fixed = IndexConfig { nlist: Some(500), ..config };
        assert_eq!(compute_ivf_params(40, &fixed), IvfParams { nlist: 40, nprobe: 8 });
    }

    #[test]
    fn builds_the_configured_kind() {
        let entries = vec![entry("a", vec![0.0, 1.0]), entry("b", vec![1.0, 0.0])];
        let flat = build_index(&IndexConfig::default(), "hash", entries.clone()).expect("flat");
        assert_eq!(flat.kind(), IndexKind::Flat);
        let ivf_config = IndexConfig { kind: IndexKind::Ivf, ..Default::default() };
        let ivf = build_index(&ivf_config, "hash", entries).expect("ivf");
        assert_eq!(ivf.kind(), IndexKind::Ivf);
        assert_eq!(ivf.embedder_id(), "hash");
        assert_eq!(ivf.search(&[0.0, 1.0], 1).expect("search")[0].chunk.content, "a");
    }

    #[test]
    fn empty_corpus_fails_for_every_kind() {
        for kind in [IndexKind::Flat, IndexKind::Ivf] {
            let config = IndexConfig { kind, ..Default::default() };
            assert!(matches!(build_index(&config, "hash", vec![]), Err(Error::EmptyCorpus)));
        }
    }
}
