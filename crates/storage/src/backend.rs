use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;
use tracing::info;

use replay_core::config::ObjectStoreConfig;

use crate::error::StorageError;

/// Build a client for one bucket of an S3-compatible store (MinIO or AWS).
///
/// Requests use path-style addressing against the configured endpoint, and
/// plain-http endpoints are allowed.
pub fn build_bucket(cfg: &ObjectStoreConfig, bucket: &str) -> Result<Arc<dyn ObjectStore>, StorageError> {
    if cfg.endpoint.is_empty() {
        return Err(StorageError::NotConfigured("OBJECT_STORE_ENDPOINT not set".into()));
    }
    if bucket.is_empty() {
        return Err(StorageError::NotConfigured("bucket name is empty".into()));
    }

    let endpoint_url = cfg.endpoint_url();
    let store = AmazonS3Builder::new()
        .with_region(&cfg.region)
        .with_bucket_name(bucket)
        .with_endpoint(&endpoint_url)
        .with_allow_http(endpoint_url.starts_with("http://"))
        .with_access_key_id(&cfg.access_key)
        .with_secret_access_key(&cfg.secret_key)
        .build()?;

    info!("Storage: bucket {} at {} (region: {})", bucket, endpoint_url, cfg.region);
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(endpoint: &str) -> ObjectStoreConfig {
        ObjectStoreConfig {
            endpoint: endpoint.to_string(),
            access_key: "minio".into(),
            secret_key: "minio123".into(),
            region: "us-east-1".into(),
            raw_bucket: "demoblobs".into(),
            results_bucket: "jsonblobs".into(),
            raw_extension: "dem".into(),
        }
    }

    #[test]
    fn builds_for_plain_host_port() {
        assert!(build_bucket(&cfg("localhost:9000"), "demoblobs").is_ok());
    }

    #[test]
    fn missing_endpoint_is_not_configured() {
        assert!(matches!(
            build_bucket(&cfg(""), "demoblobs"),
            Err(StorageError::NotConfigured(_))
        ));
    }
}
