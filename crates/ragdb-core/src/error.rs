use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Input from the record source has the wrong shape.
    #[error("Malformed record in '{source_key}': {reason}")]
    MalformedRecord { source_key: String, reason: String },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Cannot build an index over an empty corpus")]
    EmptyCorpus,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Query-path failure; the caller decides whether to answer without context.
    #[error("Retrieval failed: {0:#}")]
    Retrieval(#[source] anyhow::Error),

    #[error("Embedding provider failed: {0:#}")]
    Provider(#[source] anyhow::Error),

    #[error("Record source failed: {0:#}")]
    Source(#[source] anyhow::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn malformed(source_key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord { source_key: source_key.into(), reason: reason.into() }
    }

    /// True when the caller may carry on without the failed operation's output.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Retrieval(_))
    }

    /// True for external faults that a bounded build retry may clear.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Source(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
