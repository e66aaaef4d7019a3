use std::cmp::Ordering;

use ragdb_core::error::{Error, Result};
use ragdb_core::metric::Metric;
use ragdb_core::types::{EmbeddedChunk, ScoredChunk};

/// Orders by ascending distance, then by insertion position.
pub fn rank_order(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
}

/// The `k` best `(position, distance)` pairs in rank order.
///
/// The result does not depend on the order candidates arrive in.
pub fn top_k<I>(candidates: I, k: usize) -> Vec<(usize, f32)>
where
    I: IntoIterator<Item = (usize, f32)>,
{
    let mut all: Vec<(usize, f32)> = candidates.into_iter().collect();
    if k == 0 {
        return Vec::new();
    }
    if all.len() > k {
        all.select_nth_unstable_by(k - 1, rank_order);
        all.truncate(k);
    }
    all.sort_by(rank_order);
    all
}

pub fn check_query_dim(expected: usize, query: &[f32]) -> Result<()> {
    if query.len() != expected {
        return Err(Error::DimensionMismatch { expected, actual: query.len() });
    }
    Ok(())
}

/// Distances from `query` to the given positions of `entries`.
pub fn score_positions<'a>(
    metric: Metric,
    entries: &'a [EmbeddedChunk],
    query: &'a [f32],
    positions: impl IntoIterator<Item = usize> + 'a,
) -> impl Iterator<Item = (usize, f32)> + 'a {
    positions
        .into_iter()
        .map(move |p| (p, metric.distance(query, &entries[p].vector)))
}

pub fn materialize(entries: &[EmbeddedChunk], ranked: Vec<(usize, f32)>) -> Vec<ScoredChunk> {
    ranked
        .into_iter()
        .map(|(position, distance)| ScoredChunk { chunk: entries[position].chunk.clone(), distance, position })
        .collect()
}
