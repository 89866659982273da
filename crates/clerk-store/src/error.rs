/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A lock guarding backend state was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    Poisoned(&'static str),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
