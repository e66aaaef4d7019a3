//! Record store adapters and collection loading.

use futures::StreamExt;
use std::sync::Arc;
use tracing::{info, warn};

use ragdb_core::config::{expand_path, SourceConfig, SourceKind};
use ragdb_core::error::{Error, Result};
use ragdb_core::normalize::FailurePolicy;
use ragdb_core::traits::RecordSource;
use ragdb_core::types::Record;

pub mod collection;
pub mod dir;
pub mod memory;
pub mod upstash;

pub use collection::{decode_collection, filter_keys};
pub use dir::DirSource;
pub use memory::MemorySource;
pub use upstash::UpstashSource;

/// Records gathered from every non-reserved collection, in key order.
#[derive(Debug, Default)]
pub struct LoadedRecords {
    /// Keys that were fetched, reserved keys excluded.
    pub keys: Vec<String>,
    pub records: Vec<Record>,
    /// Keys whose payload lacked the `"0"` marker or failed to decode.
    pub skipped: Vec<String>,
    pub errors: Vec<Error>,
}

pub fn source_from_config(config: &SourceConfig) -> Result<Arc<dyn RecordSource>> {
    Ok(match config.kind {
        SourceKind::Upstash => Arc::new(UpstashSource::from_config(config)?),
        SourceKind::Dir => Arc::new(DirSource::new(expand_path(&config.data_dir))),
    })
}

/// Lists keys, drops `excluded`, and fetches the rest with up to
/// `concurrency` requests in flight. Output order follows the key listing.
///
/// A collection that fails to decode is dropped under `Skip` and aborts the
/// load under `FailFast`. Source I/O errors always abort.
pub async fn load_records(
    source: &dyn RecordSource,
    excluded: &[String],
    concurrency: usize,
    policy: FailurePolicy,
) -> Result<LoadedRecords> {
    let keys = filter_keys(source.list_keys().await?, excluded);
    info!(count = keys.len(), "loading collections");

    let fetched: Vec<(String, Result<Option<Vec<Record>>>)> = futures::stream::iter(keys.clone())
        .map(|key| async move {
            let result = source.fetch_collection(&key).await;
            (key, result)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut loaded = LoadedRecords { keys, ..Default::default() };
    for (key, result) in fetched {
        match result {
            Ok(Some(records)) => loaded.records.extend(records),
            Ok(None) => {
                warn!(key = %key, "skipping collection without a \"0\" payload");
                loaded.skipped.push(key);
            }
            Err(e @ Error::MalformedRecord { .. }) if policy == FailurePolicy::Skip => {
                warn!(key = %key, "skipping collection: {e}");
                loaded.skipped.push(key);
                loaded.errors.push(e);
            }
            Err(e) => return Err(e),
        }
    }
    info!(records = loaded.records.len(), skipped = loaded.skipped.len(), "collections loaded");
    Ok(loaded)
}
