//! Collection payload decoding.
//!
//! Accepted shapes for one collection value:
//! - a JSON array of entries
//! - an object whose `"0"` member is that array, or the array encoded as a JSON string
//! - `null`, an empty collection
//!
//! An object without `"0"` is not a collection and is skipped. Anything that
//! is still not a list after unwrapping fails the whole collection.

use serde_json::Value;

use ragdb_core::error::{Error, Result};
use ragdb_core::normalize::json_kind;
use ragdb_core::types::Record;

pub const PAYLOAD_MARKER: &str = "0";

/// `Ok(None)` when the payload has no `"0"` marker.
pub fn decode_collection(key: &str, payload: Value) -> Result<Option<Vec<Record>>> {
    let entries = match payload {
        Value::Null => Vec::new(),
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove(PAYLOAD_MARKER) {
            None => return Ok(None),
            Some(inner) => decode_list(key, inner)?,
        },
        other => {
            return Err(Error::malformed(key, format!("expected a list, got {}", json_kind(&other))));
        }
    };
    Ok(Some(entries.iter().map(|e| Record::from_entry(key, e)).collect()))
}

/// Parses raw stored text, then decodes it as a collection.
pub fn decode_collection_str(key: &str, raw: &str) -> Result<Option<Vec<Record>>> {
    if raw.trim().is_empty() {
        return Ok(Some(Vec::new()));
    }
    let payload: Value = serde_json::from_str(raw)
        .map_err(|e| Error::malformed(key, format!("payload is not valid JSON: {e}")))?;
    decode_collection(key, payload)
}

fn decode_list(key: &str, inner: Value) -> Result<Vec<Value>> {
    match inner {
        Value::Array(entries) => Ok(entries),
        Value::Null => Ok(Vec::new()),
        Value::String(encoded) => match serde_json::from_str::<Value>(&encoded) {
            Ok(Value::Array(entries)) => Ok(entries),
            Ok(other) => Err(Error::malformed(key, format!("expected a list, got {}", json_kind(&other)))),
            Err(e) => Err(Error::malformed(key, format!("\"0\" is not valid JSON: {e}"))),
        },
        other => Err(Error::malformed(key, format!("expected a list, got {}", json_kind(&other)))),
    }
}

/// Drops excluded keys, keeping the order the source listed them in.
pub fn filter_keys(keys: Vec<String>, excluded: &[String]) -> Vec<String> {
    keys.into_iter().filter(|k| !excluded.contains(k)).collect()
}
