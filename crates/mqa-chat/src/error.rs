//! Error types for the conversation core.

use mqa_core::error::ChatError;

/// Errors from a key-value slot store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage quota exceeded: {size} bytes exceeds {limit} bytes")]
    QuotaExceeded { size: usize, limit: usize },
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Transport-level failures talking to the prediction endpoint.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("failed to build HTTP client: {0}")]
    HttpClientBuild(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("endpoint returned HTTP {status}")]
    Status { status: u16, body: String },
}

/// Referential-integrity violations in the answer catalog.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate topic id: {0}")]
    DuplicateId(String),
    #[error("sub-category {sub} references unknown parent {parent}")]
    UnknownParent { sub: String, parent: String },
    #[error("question {question:?} in {topic} has no stored answer")]
    MissingAnswer { topic: String, question: String },
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        ChatError::Storage(err.to_string())
    }
}

impl From<RemoteError> for ChatError {
    fn from(err: RemoteError) -> Self {
        ChatError::Remote(err.to_string())
    }
}

impl From<CatalogError> for ChatError {
    fn from(err: CatalogError) -> Self {
        ChatError::Catalog(err.to_string())
    }
}
