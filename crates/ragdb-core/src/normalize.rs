//! Record -> Document normalization.
//!
//! The document text is the property set rendered as pretty JSON: two-space
//! indentation, non-ASCII kept literally, keys in their original order
//! (serde_json `preserve_order`). The same record always renders the same text.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::{Document, Record};

/// What `normalize_all` does with a record it cannot normalize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Skip the record, collect its error and keep going.
    #[default]
    Skip,
    /// Stop at the first bad record.
    FailFast,
}

#[derive(Debug, Default)]
pub struct NormalizeReport {
    pub documents: Vec<Document>,
    pub errors: Vec<Error>,
}

pub fn normalize(record: &Record) -> Result<Document> {
    match &record.properties {
        Value::Object(_) => {}
        Value::Null => {
            return Err(Error::malformed(
                &record.source_key,
                format!("record '{}' has no properties", record.id),
            ))
        }
        other => {
            return Err(Error::malformed(
                &record.source_key,
                format!("record '{}' properties must be a mapping, got {}", record.id, json_kind(other)),
            ))
        }
    }
    let text = serde_json::to_string_pretty(&record.properties)?;
    Ok(Document { text, metadata: record.provenance() })
}

pub fn normalize_all(records: &[Record], policy: FailurePolicy) -> Result<NormalizeReport> {
    let mut report = NormalizeReport { documents: Vec::with_capacity(records.len()), errors: Vec::new() };
    for record in records {
        match normalize(record) {
            Ok(doc) => report.documents.push(doc),
            Err(e) if policy == FailurePolicy::Skip => {
                warn!(source_key = %record.source_key, id = %record.id, "skipping record: {e}");
                report.errors.push(e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}

pub fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
