//! JSON snapshots of a built index.
//!
//! A snapshot records the index kind, metric, dimension, embedder id and the
//! chunking and IVF settings next to the embedded chunks. Loading against a
//! different embedder or different build settings is refused with
//! `InvalidConfig`; the caller rebuilds instead.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use ragdb_core::chunker::ChunkerKind;
use ragdb_core::config::{IndexKind, RagConfig};
use ragdb_core::error::{Error, Result};
use ragdb_core::metric::Metric;
use ragdb_core::traits::VectorIndex;
use ragdb_core::types::EmbeddedChunk;

use crate::flat::FlatIndex;
use crate::index_build::VectorStore;
use crate::ivf::{IvfIndex, IvfParams};

const FORMAT_VERSION: u32 = 2;

/// Configuration an index was built under. A snapshot only serves the same values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildParams {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub chunker: ChunkerKind,
    pub kind: IndexKind,
    pub metric: Metric,
    /// Configured list count; `None` means derived from the corpus size.
    pub nlist: Option<usize>,
    pub nprobe: usize,
}

impl BuildParams {
    pub fn from_config(config: &RagConfig) -> Self {
        Self {
            chunk_size: config.retrieval.chunk_size,
            chunk_overlap: config.retrieval.chunk_overlap,
            chunker: config.retrieval.chunker,
            kind: config.index.kind,
            metric: config.index.metric,
            nlist: config.index.nlist,
            nprobe: config.index.nprobe,
        }
    }

    /// First setting that differs from `current`, rendered for the log.
    fn differs_from(&self, current: &BuildParams) -> Option<String> {
        let field = |name: &str, stored: String, now: String| {
            (stored != now).then(|| format!("{name} was {stored}, now {now}"))
        };
        field("chunk_size", self.chunk_size.to_string(), current.chunk_size.to_string())
            .or_else(|| field("chunk_overlap", self.chunk_overlap.to_string(), current.chunk_overlap.to_string()))
            .or_else(|| field("chunker", format!("{:?}", self.chunker), format!("{:?}", current.chunker)))
            .or_else(|| field("index kind", format!("{:?}", self.kind), format!("{:?}", current.kind)))
            .or_else(|| field("metric", self.metric.to_string(), current.metric.to_string()))
            .or_else(|| {
                if current.kind != IndexKind::Ivf {
                    return None;
                }
                field("nlist", format!("{:?}", self.nlist), format!("{:?}", current.nlist))
                    .or_else(|| field("nprobe", self.nprobe.to_string(), current.nprobe.to_string()))
            })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    format_version: u32,
    kind: IndexKind,
    metric: Metric,
    dim: usize,
    embedder_id: String,
    params: BuildParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ivf: Option<IvfShape>,
    entries: Vec<EmbeddedChunk>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct IvfShape {
    nlist: usize,
    nprobe: usize,
}

/// Writes to a sibling temp file and renames it into place.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn save_snapshot(store: &VectorStore, params: &BuildParams, path: &Path) -> Result<()> {
    let ivf = match store {
        VectorStore::Ivf(i) => Some(IvfShape { nlist: i.nlist(), nprobe: i.nprobe() }),
        VectorStore::Flat(_) => None,
    };
    let snapshot = Snapshot {
        format_version: FORMAT_VERSION,
        kind: store.kind(),
        metric: store.metric(),
        dim: store.dim(),
        embedder_id: store.embedder_id().to_string(),
        params: params.clone(),
        ivf,
        entries: store.entries().to_vec(),
    };
    write_atomically(path, &serde_json::to_vec(&snapshot)?)?;
    info!(n = store.len(), "saved index snapshot to {}", path.display());
    Ok(())
}

/// Loads a snapshot built with `embedder_id` under `params`; `dim` is checked when known.
pub fn load_snapshot(path: &Path, embedder_id: &str, dim: Option<usize>, params: &BuildParams) -> Result<VectorStore> {
    let raw = std::fs::read(path)?;
    let snapshot: Snapshot = serde_json::from_slice(&raw)
        .map_err(|e| Error::Snapshot(format!("{}: {e}", path.display())))?;
    if snapshot.format_version != FORMAT_VERSION {
        return Err(Error::Snapshot(format!(
            "{}: unsupported format version {}",
            path.display(),
            snapshot.format_version
        )));
    }
    if snapshot.embedder_id != embedder_id {
        return Err(Error::InvalidConfig(format!(
            "snapshot was built with embedder '{}' but '{}' is configured; rebuild the index",
            snapshot.embedder_id, embedder_id
        )));
    }
    if let Some(expected) = dim.filter(|&d| d != snapshot.dim) {
        return Err(Error::InvalidConfig(format!(
            "snapshot dimension {} does not match embedder dimension {expected}; rebuild the index",
            snapshot.dim
        )));
    }
    if snapshot.params.kind != snapshot.kind || snapshot.params.metric != snapshot.metric {
        return Err(Error::Snapshot(format!("{}: build settings disagree with header", path.display())));
    }
    if let Some(change) = snapshot.params.differs_from(params) {
        return Err(Error::InvalidConfig(format!("snapshot is stale ({change}); rebuild the index")));
    }
    if snapshot.entries.iter().any(|e| e.vector.len() != snapshot.dim) {
        return Err(Error::Snapshot(format!("{}: vector dimension differs from header", path.display())));
    }

    let store = match (snapshot.kind, snapshot.ivf) {
        (IndexKind::Flat, _) => {
            VectorStore::Flat(FlatIndex::build(snapshot.embedder_id, snapshot.metric, snapshot.entries)?)
        }
        (IndexKind::Ivf, shape) => {
            let params = shape.map_or(IvfParams { nlist: 1, nprobe: 1 }, |s| IvfParams { nlist: s.nlist, nprobe: s.nprobe });
            VectorStore::Ivf(IvfIndex::build(snapshot.embedder_id, snapshot.metric, snapshot.entries, params)?)
        }
    };
    info!(n = store.len(), kind = ?store.kind(), "loaded index snapshot from {}", path.display());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::entry;

    fn params() -> BuildParams {
        BuildParams { metric: Metric::Cosine, ..BuildParams::from_config(&RagConfig::default()) }
    }

    fn store() -> VectorStore {
        VectorStore::Flat(
            FlatIndex::build(
                "hash:xxh64:d2",
                Metric::Cosine,
                vec![entry("alpha", vec![1.0, 0.0]), entry("beta", vec![0.0, 1.0])],
            )
            .expect("build"),
        )
    }

    #[test]
    fn reload_answers_like_the_original() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("index/snapshot.json");
        let original = store();
        save_snapshot(&original, &params(), &path).expect("save");
        let loaded = load_snapshot(&path, "hash:xxh64:d2", Some(2), &params()).expect("load");
        assert_eq!(loaded.metric(), Metric::Cosine);
        assert_eq!(
            loaded.search(&[0.2, 0.9], 2).expect("loaded"),
            original.search(&[0.2, 0.9], 2).expect("original")
        );
    }

    #[test]
    fn provider_change_demands_rebuild() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("snapshot.json");
        save_snapshot(&store(), &params(), &path).expect("save");
        assert!(matches!(load_snapshot(&path, "remote:other", None, &params()), Err(Error::InvalidConfig(_))));
        assert!(matches!(load_snapshot(&path, "hash:xxh64:d2", Some(3), &params()), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn changed_build_settings_make_the_snapshot_stale() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("snapshot.json");
        save_snapshot(&store(), &params(), &path).expect("save");

        let smaller = BuildParams { chunk_size: 20, ..params() };
        let err = load_snapshot(&path, "hash:xxh64:d2", Some(2), &smaller).expect_err("chunk size");
        assert!(matches!(&err, Error::InvalidConfig(m) if m.contains("chunk_size")), "{err}");

        let l2 = BuildParams { metric: Metric::SquaredL2, ..params() };
        assert!(matches!(load_snapshot(&path, "hash:xxh64:d2", Some(2), &l2), Err(Error::InvalidConfig(_))));

        let structured = BuildParams { chunker: ChunkerKind::Structured, ..params() };
        assert!(matches!(load_snapshot(&path, "hash:xxh64:d2", Some(2), &structured), Err(Error::InvalidConfig(_))));

        // IVF tuning only matters for IVF indexes.
        let retuned = BuildParams { nprobe: 99, ..params() };
        assert!(load_snapshot(&path, "hash:xxh64:d2", Some(2), &retuned).is_ok());
    }

    #[test]
    fn garbage_is_a_snapshot_error() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, b"{ not json").expect("write");
        assert!(matches!(load_snapshot(&path, "x", None, &params()), Err(Error::Snapshot(_))));
    }
}
