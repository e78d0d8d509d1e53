//! Error types for backend communication.

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors that can occur while talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The client was used before [`configure`](crate::BackendClient::configure).
    #[error("Backend client not configured")]
    NotConfigured,

    /// The transport is not connected.
    #[error("Not connected to broker")]
    NotConnected,

    /// Transport-level failure (connect, publish, receive).
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Message encoding failed.
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}
