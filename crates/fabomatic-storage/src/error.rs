//! Error types for settings persistence.

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur while persisting settings.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings encoding failed.
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}
