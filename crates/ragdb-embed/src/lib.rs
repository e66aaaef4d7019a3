//! Embedding providers behind the `ragdb_core::traits::Embedder` seam.

use std::sync::Arc;
use tracing::info;

use ragdb_core::config::{expand_path, EmbedderConfig, EmbedderKind};
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::Embedder;

pub mod device;
pub mod glove;
pub mod guard;
pub mod hashing;
pub mod model;
pub mod pool;
pub mod remote;
pub mod tokenize;

pub use glove::WordVectorEmbedder;
pub use guard::DimensionGuard;
pub use hashing::HashEmbedder;
pub use model::LocalModelEmbedder;
pub use pool::masked_mean_l2;
pub use remote::{RemoteEmbedder, RemoteSettings};

/// Dimension of the hash embedder when none is configured (MiniLM width).
pub const DEFAULT_HASH_DIM: usize = 384;

pub type SharedEmbedder = Arc<dyn Embedder>;

/// True when `APP_USE_FAKE_EMBEDDINGS` asks for the offline hash embedder.
pub fn fake_embeddings_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Builds the configured provider wrapped in a `DimensionGuard`.
pub fn build_embedder(config: &EmbedderConfig) -> Result<SharedEmbedder> {
    let kind = if fake_embeddings_requested() { EmbedderKind::Hash } else { config.kind };
    let inner: Box<dyn Embedder> = match kind {
        EmbedderKind::Hash => Box::new(HashEmbedder::new(config.dimension.unwrap_or(DEFAULT_HASH_DIM))?),
        EmbedderKind::Local => {
            let dir = model::resolve_model_dir(config.model_dir.as_deref()).map_err(Error::Provider)?;
            Box::new(LocalModelEmbedder::load(&dir).map_err(Error::Provider)?)
        }
        EmbedderKind::Glove => {
            let path = config
                .vectors_path
                .as_deref()
                .ok_or_else(|| Error::InvalidConfig("embedder.vectors_path is required for glove".into()))?;
            Box::new(WordVectorEmbedder::load(&expand_path(path)).map_err(Error::Provider)?)
        }
        EmbedderKind::Remote => Box::new(RemoteEmbedder::new(RemoteSettings::from_config(config))),
    };
    let guarded = DimensionGuard::new(inner);
    if let (Some(expected), Some(_)) = (config.dimension, guarded.dim()) {
        guarded.pin(expected)?;
    }
    info!(embedder_id = guarded.embedder_id(), dim = ?guarded.dim(), "embedder ready");
    Ok(Arc::new(guarded))
}
