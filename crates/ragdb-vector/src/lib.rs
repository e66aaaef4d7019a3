//! Vector indexes over embedded chunks: exhaustive and IVF search, build-time
//! embedding with a content-hash cache, snapshots, and the swappable active
//! index handle.

pub mod active;
pub mod cache;
pub mod embed_chunks;
pub mod flat;
pub mod index_build;
pub mod ivf;
pub mod search;
pub mod snapshot;

pub use active::ActiveIndex;
pub use cache::EmbeddingCache;
pub use embed_chunks::{embed_chunks, EmbedOptions, EmbedStats};
pub use flat::FlatIndex;
pub use index_build::{build_index, compute_ivf_params, VectorStore};
pub use ivf::{IvfIndex, IvfParams};
pub use snapshot::{load_snapshot, save_snapshot, BuildParams};
