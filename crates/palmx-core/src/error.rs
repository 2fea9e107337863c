use std::time::Duration;
use thiserror::Error;

/// Failure modes of the retrieval engine and its offline builder.
///
/// `IndexNotReady`, `IndexCorrupt` and `EmbeddingUnavailable` are absorbed by
/// the retriever's fallback path; only `InvalidQuery` reaches a search caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Index not ready: {0}")]
    IndexNotReady(String),

    #[error("Index corrupt: {0}")]
    IndexCorrupt(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Index build aborted at entry '{id}': {reason}")]
    BuildAborted { id: String, reason: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Result of a single call to an embedding provider.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding call timed out after {0:?}")]
    Timeout(Duration),

    #[error("embedding provider failed: {0}")]
    Provider(String),

    #[error("invalid embedding: {0}")]
    InvalidVector(String),
}

impl From<EmbedError> for Error {
    fn from(e: EmbedError) -> Self { Error::EmbeddingUnavailable(e.to_string()) }
}
