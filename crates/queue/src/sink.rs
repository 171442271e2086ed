//! Ingestion acknowledgement.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use replay_core::config::ApiConfig;
use replay_core::SessionId;

use crate::error::QueueError;

/// Accepts "the result for this session is available".
///
/// A rejected acknowledgement leaves the session listed upstream, so it may
/// be offered again later (at-least-once processing).
#[async_trait]
pub trait IngestionSink: Send + Sync {
    async fn acknowledge(&self, id: &SessionId) -> Result<(), QueueError>;
}

/// `POST <ingest-url>?api_key=<key>&session_id=<id>` with body
/// `{"session_id": <id>}`; only `201 Created` counts as accepted.
pub struct HttpIngestionSink {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpIngestionSink {
    pub fn new(client: reqwest::Client, api: &ApiConfig) -> Result<Self, QueueError> {
        if api.ingest_url.is_empty() {
            return Err(QueueError::NotConfigured("INGEST_URL not set".into()));
        }
        Ok(Self {
            client,
            url: api.ingest_url.clone(),
            api_key: api.api_key.clone(),
        })
    }
}

#[async_trait]
impl IngestionSink for HttpIngestionSink {
    async fn acknowledge(&self, id: &SessionId) -> Result<(), QueueError> {
        let response = self
            .client
            .post(&self.url)
            .query(&[("api_key", self.api_key.as_str()), ("session_id", id.as_str())])
            .json(&serde_json::json!({ "session_id": id }))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(QueueError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(session_id = %id, "ingestion acknowledged");
        Ok(())
    }
}
