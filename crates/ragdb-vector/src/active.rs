use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

use ragdb_core::traits::VectorIndex;

use crate::index_build::VectorStore;

/// Handle to the index currently serving queries.
///
/// Readers clone the `Arc` and search without holding any lock. A rebuild
/// constructs its index elsewhere and flips the pointer with `swap`, so no
/// reader ever sees a partially built index.
#[derive(Debug, Default)]
pub struct ActiveIndex {
    current: RwLock<Option<Arc<VectorStore>>>,
    generation: AtomicU64,
}

impl ActiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(index: VectorStore) -> Self {
        let active = Self::default();
        active.swap(index);
        active
    }

    pub fn current(&self) -> Option<Arc<VectorStore>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Installs `index` and returns the one it replaced.
    pub fn swap(&self, index: VectorStore) -> Option<Arc<VectorStore>> {
        let n = index.len();
        let next = Arc::new(index);
        let previous = {
            let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
            slot.replace(next)
        };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation, n, "active index swapped");
        previous
    }

    /// Number of swaps so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat::FlatIndex;
    use crate::testing::entry;
    use ragdb_core::metric::Metric;

    fn index(tag: &str) -> VectorStore {
        VectorStore::Flat(FlatIndex::build(tag, Metric::SquaredL2, vec![entry(tag, vec![1.0])]).expect("build"))
    }

    #[test]
    fn readers_keep_their_snapshot_across_a_swap() {
        let active = ActiveIndex::new();
        assert!(active.current().is_none());
        active.swap(index("old"));
        let held = active.current().expect("old");
        let previous = active.swap(index("new")).expect("previous");
        assert_eq!(held.embedder_id(), "old");
        assert_eq!(previous.embedder_id(), "old");
        assert_eq!(active.current().expect("new").embedder_id(), "new");
        assert_eq!(active.generation(), 2);
    }
}
