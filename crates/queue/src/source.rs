//! Remote job listing.

use async_trait::async_trait;
use tracing::debug;

use replay_core::config::ApiConfig;

use crate::error::QueueError;

/// Answers "give me up to N pending session ids".
///
/// Repeated calls may return overlapping ids; callers dedupe. Ids are
/// returned raw and validated by the caller so one malformed entry does not
/// discard the whole batch.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn pending(&self, limit: usize) -> Result<Vec<String>, QueueError>;
}

/// `GET <jobs-url>?api_key=<key>&limit=<n>` returning a JSON array of strings.
pub struct HttpJobSource {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpJobSource {
    pub fn new(client: reqwest::Client, api: &ApiConfig) -> Result<Self, QueueError> {
        if api.jobs_url.is_empty() {
            return Err(QueueError::NotConfigured("JOBS_URL not set".into()));
        }
        Ok(Self {
            client,
            url: api.jobs_url.clone(),
            api_key: api.api_key.clone(),
        })
    }
}

#[async_trait]
impl JobSource for HttpJobSource {
    async fn pending(&self, limit: usize) -> Result<Vec<String>, QueueError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(&[("limit", limit)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(QueueError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let ids: Vec<String> = response.json().await?;
        debug!(count = ids.len(), limit, "fetched pending sessions");
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};

    use super::*;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/jobs")
    }

    fn api(url: &str) -> ApiConfig {
        ApiConfig {
            jobs_url: url.to_string(),
            ingest_url: String::new(),
            api_key: "secret".to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }

    async fn list_jobs(
        Query(params): Query<HashMap<String, String>>,
    ) -> Result<Json<Vec<String>>, (StatusCode, String)> {
        if params.get("api_key").map(String::as_str) != Some("secret") {
            return Err((StatusCode::UNAUTHORIZED, "bad key".to_string()));
        }
        let limit: usize = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(0);
        let ids = ["s1", "s2", "s3"].iter().take(limit).map(|s| s.to_string()).collect();
        Ok(Json(ids))
    }

    #[tokio::test]
    async fn pending_sends_key_and_limit() {
        let url = serve(Router::new().route("/jobs", get(list_jobs))).await;
        let source = HttpJobSource::new(reqwest::Client::new(), &api(&url)).unwrap();

        let ids = source.pending(2).await.unwrap();
        assert_eq!(ids, vec!["s1".to_string(), "s2".to_string()]);
    }

    #[tokio::test]
    async fn non_success_status_carries_body() {
        let url = serve(Router::new().route("/jobs", get(list_jobs))).await;
        let mut cfg = api(&url);
        cfg.api_key = "wrong".into();
        let source = HttpJobSource::new(reqwest::Client::new(), &cfg).unwrap();

        match source.pending(1).await {
            Err(QueueError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let router = Router::new().route("/jobs", get(|| async { "not json" }));
        let url = serve(router).await;
        let source = HttpJobSource::new(reqwest::Client::new(), &api(&url)).unwrap();

        assert!(matches!(source.pending(1).await, Err(QueueError::Decode(_))));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_connection_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let source =
            HttpJobSource::new(reqwest::Client::new(), &api(&format!("http://{addr}/jobs"))).unwrap();

        assert!(matches!(source.pending(1).await, Err(QueueError::Connection(_))));
    }

    #[test]
    fn empty_url_is_rejected() {
        assert!(matches!(
            HttpJobSource::new(reqwest::Client::new(), &api("")),
            Err(QueueError::NotConfigured(_))
        ));
    }
}
