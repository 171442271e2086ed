//! Raw artifact download and result upload, keyed by session id.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use replay_core::config::ObjectStoreConfig;
use replay_core::SessionId;

use crate::backend::build_bucket;
use crate::error::StorageError;

/// Fetch/put of session blobs.
///
/// Raw artifacts live under `<id>.<ext>` in the raw bucket; results under
/// `<id>.json` in the results bucket.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stream the raw artifact for `id` into `dest`, returning bytes written.
    async fn fetch_raw(&self, id: &SessionId, dest: &Path) -> Result<u64, StorageError>;

    /// Upload the result document stored at `src`.
    async fn store_result(&self, id: &SessionId, src: &Path) -> Result<(), StorageError>;
}

pub struct ObjectArtifactStore {
    raw: Arc<dyn ObjectStore>,
    results: Arc<dyn ObjectStore>,
    raw_extension: String,
}

impl ObjectArtifactStore {
    pub fn new(raw: Arc<dyn ObjectStore>, results: Arc<dyn ObjectStore>, raw_extension: impl Into<String>) -> Self {
        Self {
            raw,
            results,
            raw_extension: raw_extension.into(),
        }
    }

    pub fn from_config(cfg: &ObjectStoreConfig) -> Result<Self, StorageError> {
        Ok(Self::new(
            build_bucket(cfg, &cfg.raw_bucket)?,
            build_bucket(cfg, &cfg.results_bucket)?,
            cfg.raw_extension.clone(),
        ))
    }

    pub fn raw_key(&self, id: &SessionId) -> ObjectPath {
        ObjectPath::from(format!("{}.{}", id, self.raw_extension))
    }

    pub fn result_key(id: &SessionId) -> ObjectPath {
        ObjectPath::from(format!("{id}.json"))
    }
}

#[async_trait]
impl ArtifactStore for ObjectArtifactStore {
    async fn fetch_raw(&self, id: &SessionId, dest: &Path) -> Result<u64, StorageError> {
        let key = self.raw_key(id);
        let mut stream = self.raw.get(&key).await?.into_stream();

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = stream.try_next().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(session_id = %id, key = %key, bytes = written, "raw artifact downloaded");
        Ok(written)
    }

    async fn store_result(&self, id: &SessionId, src: &Path) -> Result<(), StorageError> {
        let data = tokio::fs::read(src).await?;
        let len = data.len();
        let key = Self::result_key(id);
        self.results.put(&key, PutPayload::from(data)).await?;

        debug!(session_id = %id, key = %key, bytes = len, "result uploaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use object_store::memory::InMemory;

    use super::*;

    fn store() -> (ObjectArtifactStore, Arc<InMemory>, Arc<InMemory>) {
        let raw = Arc::new(InMemory::new());
        let results = Arc::new(InMemory::new());
        let store = ObjectArtifactStore::new(raw.clone(), results.clone(), "dem");
        (store, raw, results)
    }

    fn id(s: &str) -> SessionId {
        SessionId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn fetch_streams_raw_object_to_disk() {
        let (store, raw, _) = store();
        raw.put(&ObjectPath::from("s1.dem"), PutPayload::from(Bytes::from_static(b"demo-bytes")))
            .await
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("s1.dem");

        let written = store.fetch_raw(&id("s1"), &dest).await.unwrap();

        assert_eq!(written, 10);
        assert_eq!(std::fs::read(&dest).unwrap(), b"demo-bytes");
    }

    #[tokio::test]
    async fn missing_raw_object_reports_not_found() {
        let (store, _, _) = store();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("s2.dem");

        let err = store.fetch_raw(&id("s2"), &dest).await.unwrap_err();

        assert!(matches!(err, StorageError::ObjectStore(object_store::Error::NotFound { .. })));
        assert!(err.to_string().contains("not found"), "{err}");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn result_lands_under_json_key() {
        let (store, _, results) = store();
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("s1.json");
        std::fs::write(&src, br#"{"ok":true}"#).unwrap();

        store.store_result(&id("s1"), &src).await.unwrap();

        let stored = results
            .get(&ObjectPath::from("s1.json"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(&stored[..], br#"{"ok":true}"#);
    }

    #[test]
    fn keys_follow_naming() {
        let (store, _, _) = store();
        assert_eq!(store.raw_key(&id("abc")).as_ref(), "abc.dem");
        assert_eq!(ObjectArtifactStore::result_key(&id("abc")).as_ref(), "abc.json");
    }
}
