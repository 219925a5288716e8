//! Error types for notification channels.

use thiserror::Error;

/// Errors that can occur when sending a notification.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Channel credentials are missing.
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    /// Provider accepted the request but refused the message.
    #[error("Rejected by provider ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Send did not finish in time.
    #[error("Send timed out after {0:?}")]
    Timeout(std::time::Duration),
}
