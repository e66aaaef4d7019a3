//! Embedding cache keyed by `(embedder_id, content_hash)`.
//!
//! The build consults it before calling a provider and writes through on
//! misses, so a rebuild over unchanged content makes no provider calls.
//! Keys include the provider identity; vectors never cross providers.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

use ragdb_core::error::Result;

pub fn content_hash(s: &str) -> String {
    blake3::hash(s.as_bytes()).to_hex().to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content_hash: String,
    pub embedder_id: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Default)]
pub struct EmbeddingCache {
    entries: RwLock<HashMap<(String, String), Vec<f32>>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached vectors for the given hashes, keyed by hash.
    pub fn get_many(&self, embedder_id: &str, hashes: &[String]) -> HashMap<String, Vec<f32>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        hashes
            .iter()
            .filter_map(|h| {
                entries
                    .get(&(embedder_id.to_string(), h.clone()))
                    .map(|v| (h.clone(), v.clone()))
            })
            .collect()
    }

    pub fn put_many(&self, new_entries: Vec<CacheEntry>) {
        if new_entries.is_empty() {
            return;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for e in new_entries {
            entries.insert((e.embedder_id, e.content_hash), e.vector);
        }
    }

    /// Drops every entry except `embedder_id`'s vectors for `hashes`.
    /// Returns the number of entries removed.
    pub fn retain_only(&self, embedder_id: &str, hashes: &[String]) -> usize {
        let live: HashSet<&str> = hashes.iter().map(String::as_str).collect();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(id, hash), _| id == embedder_id && live.contains(hash.as_str()));
        before - entries.len()
    }

    /// Reads a cache file written by `save`; a missing file is an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no embedding cache at {}", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read(path)?;
        let list: Vec<CacheEntry> = serde_json::from_slice(&raw)?;
        let cache = Self::default();
        cache.put_many(list);
        info!(entries = cache.len(), "loaded embedding cache from {}", path.display());
        Ok(cache)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let list: Vec<CacheEntry> = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            let mut list: Vec<CacheEntry> = entries
                .iter()
                .map(|((embedder_id, content_hash), vector)| CacheEntry {
                    content_hash: content_hash.clone(),
                    embedder_id: embedder_id.clone(),
                    vector: vector.clone(),
                })
                .collect();
            list.sort_by(|a, b| (&a.embedder_id, &a.content_hash).cmp(&(&b.embedder_id, &b.content_hash)));
            list
        };
        crate::snapshot::write_atomically(path, &serde_json::to_vec(&list)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_by_provider_and_content() {
        let cache = EmbeddingCache::new();
        let h = content_hash("hello");
        cache.put_many(vec![CacheEntry { content_hash: h.clone(), embedder_id: "a".into(), vector: vec![1.0] }]);
        assert_eq!(cache.get_many("a", &[h.clone()]).get(&h), Some(&vec![1.0]));
        assert!(cache.get_many("b", &[h]).is_empty());
        assert_ne!(content_hash("hello"), content_hash("hello "));
    }

    #[test]
    fn survives_a_save_and_load() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("cache/embeddings.json");
        let cache = EmbeddingCache::new();
        cache.put_many(vec![
            CacheEntry { content_hash: content_hash("x"), embedder_id: "hash".into(), vector: vec![0.5, 0.5] },
            CacheEntry { content_hash: content_hash("y"), embedder_id: "hash".into(), vector: vec![1.0, 0.0] },
        ]);
        cache.save(&path).expect("save");
        let loaded = EmbeddingCache::load(&path).expect("load");
        assert_eq!(loaded.len(), 2);
        assert!(EmbeddingCache::load(&dir.path().join("missing.json")).expect("missing").is_empty());
    }

    #[test]
    fn retain_only_keeps_the_live_corpus_of_one_provider() {
        let cache = EmbeddingCache::new();
        let entry = |id: &str, text: &str| CacheEntry { content_hash: content_hash(text), embedder_id: id.into(), vector: vec![1.0] };
        cache.put_many(vec![entry("a", "kept"), entry("a", "deleted doc"), entry("b", "kept")]);

        let removed = cache.retain_only("a", &[content_hash("kept"), content_hash("never cached")]);
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_many("a", &[content_hash("kept")]).len(), 1);
        assert!(cache.get_many("b", &[content_hash("kept")]).is_empty());
    }
}
