use async_trait::async_trait;
use serde_json::Value;

use ragdb_core::error::Result;
use ragdb_core::traits::RecordSource;
use ragdb_core::types::Record;

use crate::collection::decode_collection;

/// Collections held in memory, listed in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    collections: Vec<(String, Value)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a collection payload.
    pub fn insert(&mut self, key: impl Into<String>, payload: Value) {
        let key = key.into();
        match self.collections.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = payload,
            None => self.collections.push((key, payload)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, payload: Value) -> Self {
        self.insert(key, payload);
        self
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.collections.iter().map(|(k, _)| k.clone()).collect())
    }

    async fn fetch_collection(&self, key: &str) -> Result<Option<Vec<Record>>> {
        match self.collections.iter().find(|(k, _)| k == key) {
            Some((_, payload)) => decode_collection(key, payload.clone()),
            None => Ok(Some(Vec::new())),
        }
    }
}
