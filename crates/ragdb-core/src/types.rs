//! Domain types shared by the normalizer, chunkers, embedders and indexes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a piece of text came from: the record id and its upstream collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provenance {
    pub id: String,
    pub source_key: String,
}

impl Provenance {
    pub fn new(id: impl Into<String>, source_key: impl Into<String>) -> Self {
        Self { id: id.into(), source_key: source_key.into() }
    }
}

/// A raw structured item fetched read-only from a record source.
///
/// `properties` is kept as an untyped JSON value; shape checks belong to the
/// normalizer so one bad record never fails its whole collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub source_key: String,
    pub properties: Value,
}

impl Record {
    pub fn new(id: impl Into<String>, source_key: impl Into<String>, properties: Value) -> Self {
        Self { id: id.into(), source_key: source_key.into(), properties }
    }

    /// Builds a record from one entry of a collection payload.
    ///
    /// A missing `id` becomes the empty string; non-string scalar ids are
    /// rendered as text. A missing `properties` member becomes `Null`.
    pub fn from_entry(source_key: &str, entry: &Value) -> Self {
        let id = match entry.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let properties = entry.get("properties").cloned().unwrap_or(Value::Null);
        Self { id, source_key: source_key.to_string(), properties }
    }

    pub fn provenance(&self) -> Provenance {
        Provenance::new(self.id.clone(), self.source_key.clone())
    }
}

/// Normalized text derived from exactly one [`Record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: Provenance,
}

/// A contiguous window of a document's text.
///
/// `start`/`end` are character offsets into the parent text (end exclusive).
/// Chunks have no id of their own; they are addressed by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: Provenance,
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// One search result: the stored chunk, its distance to the query and its
/// insertion position in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub distance: f32,
    pub position: usize,
}
