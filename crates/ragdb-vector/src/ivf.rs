//! Inverted-file approximate index.
//!
//! A deterministic k-means coarse quantizer splits the vectors into `nlist`
//! lists. A query scores the `nprobe` closest centroids, then ranks the
//! members of those lists exactly, with the same tie-break as the flat index.
//! Probing every list gives exactly the flat result.

use tracing::debug;

use ragdb_core::error::Result;
use ragdb_core::metric::Metric;
use ragdb_core::traits::VectorIndex;
use ragdb_core::types::{EmbeddedChunk, ScoredChunk};

use crate::flat::{validate_entries, FlatIndex};
use crate::search::{check_query_dim, materialize, score_positions, top_k};

const KMEANS_ITERATIONS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IvfParams {
    pub nlist: usize,
    pub nprobe: usize,
}

#[derive(Debug, Clone)]
pub struct IvfIndex {
    flat: FlatIndex,
    centroids: Vec<Vec<f32>>,
    lists: Vec<Vec<usize>>,
    nprobe: usize,
}

impl IvfIndex {
    pub fn build(
        embedder_id: impl Into<String>,
        metric: Metric,
        entries: Vec<EmbeddedChunk>,
        params: IvfParams,
    ) -> Result<Self> {
        let dim = validate_entries(&entries)?;
        let n = entries.len();
        let nlist = params.nlist.clamp(1, n);
        let nprobe = params.nprobe.clamp(1, nlist);

        // Seeds are evenly spaced entries, so the same input always trains the same lists.
        let mut centroids: Vec<Vec<f32>> = (0..nlist).map(|i| entries[i * n / nlist].vector.clone()).collect();
        let mut assignment = vec![usize::MAX; n];
        for _ in 0..KMEANS_ITERATIONS {
            if !assign(metric, &centroids, &entries, &mut assignment) {
                break;
            }
            update_centroids(dim, &entries, &assignment, &mut centroids);
        }
        assign(metric, &centroids, &entries, &mut assignment);

        let mut lists = vec![Vec::new(); nlist];
        for (position, &list) in assignment.iter().enumerate() {
            lists[list].push(position);
        }
        debug!(n, nlist, nprobe, "ivf index trained");
        let flat = FlatIndex::build(embedder_id, metric, entries)?;
        Ok(Self { flat, centroids, lists, nprobe })
    }

    pub fn nlist(&self) -> usize {
        self.centroids.len()
    }

    pub fn nprobe(&self) -> usize {
        self.nprobe
    }

    pub fn entries(&self) -> &[EmbeddedChunk] {
        self.flat.entries()
    }

    pub fn list_sizes(&self) -> Vec<usize> {
        self.lists.iter().map(Vec::len).collect()
    }
}

fn nearest_centroid(metric: Metric, centroids: &[Vec<f32>], v: &[f32]) -> usize {
    let scored = centroids.iter().enumerate().map(|(i, c)| (i, metric.distance(v, c)));
    top_k(scored, 1).first().map_or(0, |&(i, _)| i)
}

/// Reassigns every vector; returns whether any assignment changed.
fn assign(metric: Metric, centroids: &[Vec<f32>], entries: &[EmbeddedChunk], assignment: &mut [usize]) -> bool {
    let mut changed = false;
    for (slot, e) in assignment.iter_mut().zip(entries) {
        let best = nearest_centroid(metric, centroids, &e.vector);
        if *slot != best {
            *slot = best;
            changed = true;
        }
    }
    changed
}

/// Empty lists keep their previous centroid.
fn update_centroids(dim: usize, entries: &[EmbeddedChunk], assignment: &[usize], centroids: &mut [Vec<f32>]) {
    let mut sums = vec![vec![0.0f32; dim]; centroids.len()];
    let mut counts = vec![0usize; centroids.len()];
    for (e, &list) in entries.iter().zip(assignment) {
        counts[list] += 1;
        sums[list].iter_mut().zip(&e.vector).for_each(|(s, x)| *s += x);
    }
    for ((centroid, sum), count) in centroids.iter_mut().zip(sums).zip(counts) {
        if count > 0 {
            *centroid = sum.into_iter().map(|s| s / count as f32).collect();
        }
    }
}

impl VectorIndex for IvfIndex {
    fn dim(&self) -> usize {
        self.flat.dim
    }

    fn len(&self) -> usize {
        self.flat.entries.len()
    }

    fn metric(&self) -> Metric {
        self.flat.metric
    }

    fn embedder_id(&self) -> &str {
        &self.flat.embedder_id
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        check_query_dim(self.flat.dim, query)?;
        let metric = self.flat.metric;
        let probes = top_k(self.centroids.iter().enumerate().map(|(i, c)| (i, metric.distance(query, c))), self.nprobe);
        let candidates = probes.iter().flat_map(|&(list, _)| self.lists[list].iter().copied());
        let scored = score_positions(metric, &self.flat.entries, query, candidates);
        Ok(materialize(&self.flat.entries, top_k(scored, k)))
    }
}
