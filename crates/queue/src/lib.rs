pub mod error;
pub mod sink;
pub mod source;

pub use error::QueueError;
pub use sink::{HttpIngestionSink, IngestionSink};
pub use source::{HttpJobSource, JobSource};

/// Shared client for both endpoints (connection pooling).
pub fn http_client(api: &replay_core::config::ApiConfig) -> Result<reqwest::Client, QueueError> {
    reqwest::Client::builder()
        .timeout(api.request_timeout)
        .build()
        .map_err(|e| QueueError::NotConfigured(format!("http client: {e}")))
}
