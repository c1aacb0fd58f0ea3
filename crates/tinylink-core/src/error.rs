use thiserror::Error;

/// Result type for mapping store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Failures raised by a backing strategy.
///
/// A duplicate original URL is never reported here; stores signal it through
/// [`InsertOutcome::AlreadyExists`](crate::store::InsertOutcome).
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("short code already taken by another url: {0}")]
    CodeCollision(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Whether the backing medium could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_) | StorageError::Timeout(_))
    }
}

/// Errors surfaced by the shortener operations.
#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("url cannot be empty")]
    EmptyUrl,
    #[error("batch cannot be empty")]
    EmptyBatch,
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("request exceeded its processing deadline")]
    Timeout,
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for ShortenerError {
    fn from(value: StorageError) -> Self {
        if value.is_unavailable() {
            return Self::StorageUnavailable(value.to_string());
        }
        Self::Storage(value.to_string())
    }
}
