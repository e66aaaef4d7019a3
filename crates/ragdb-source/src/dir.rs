use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use ragdb_core::error::Result;
use ragdb_core::traits::RecordSource;
use ragdb_core::types::Record;

use crate::collection::decode_collection_str;

type KeyPaths = BTreeMap<String, PathBuf>;

/// Every `*.json` file under a directory is one collection, keyed by file stem.
///
/// `list_keys` walks the directory and remembers the result; fetches resolve
/// keys against that listing instead of walking again.
#[derive(Debug)]
pub struct DirSource {
    root: PathBuf,
    listing: Mutex<Option<Arc<KeyPaths>>>,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), listing: Mutex::new(None) }
    }

    fn rescan(&self) -> Arc<KeyPaths> {
        let scanned = Arc::new(self.scan());
        *self.listing.lock().unwrap_or_else(PoisonError::into_inner) = Some(scanned.clone());
        scanned
    }

    fn listing(&self) -> Arc<KeyPaths> {
        let cached = self.listing.lock().unwrap_or_else(PoisonError::into_inner).clone();
        cached.unwrap_or_else(|| self.rescan())
    }

    /// Key -> path; on duplicate stems the first path in sorted order wins.
    fn scan(&self) -> KeyPaths {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "json"))
            .map(|e| e.into_path())
            .collect();
        files.sort();
        let mut out: KeyPaths = BTreeMap::new();
        for path in files {
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else { continue };
            if let Some(existing) = out.get(&stem) {
                warn!("ignoring {}: key '{stem}' already read from {}", path.display(), existing.display());
                continue;
            }
            out.insert(stem, path);
        }
        out
    }
}

#[async_trait]
impl RecordSource for DirSource {
    async fn list_keys(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            warn!("data directory {} does not exist", self.root.display());
            return Ok(Vec::new());
        }
        let keys: Vec<String> = self.rescan().keys().cloned().collect();
        debug!(count = keys.len(), "found json collections in {}", self.root.display());
        Ok(keys)
    }

    async fn fetch_collection(&self, key: &str) -> Result<Option<Vec<Record>>> {
        let Some(path) = self.listing().get(key).cloned() else {
            return Ok(Some(Vec::new()));
        };
        let raw = tokio::fs::read_to_string(&path).await?;
        decode_collection_str(key, &raw)
    }
}
