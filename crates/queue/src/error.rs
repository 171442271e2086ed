//! Queue error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response decode error: {0}")]
    Decode(String),

    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for QueueError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            QueueError::Decode(e.to_string())
        } else {
            QueueError::Connection(e.to_string())
        }
    }
}
