//! Core types and seams for the retrieval engine: records, documents,
//! chunks, the error taxonomy, configuration, normalization and chunking.

pub mod chunker;
pub mod config;
pub mod error;
pub mod metric;
pub mod normalize;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
