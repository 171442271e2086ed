//! Per-session processing sequence.
//!
//! fetch raw artifact -> analyze -> upload result -> acknowledge ingestion.
//! Every error is converted into a [`JobOutcome`] at this boundary, and the
//! local files for the session are removed whatever the outcome.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use replay_core::SessionId;
use replay_queue::{IngestionSink, QueueError};
use replay_storage::{ArtifactStore, StorageError};

use crate::analysis::{AnalysisError, AnalysisRunner};
use crate::outcome::JobOutcome;
use crate::workspace::{JobFiles, JobWorkspace};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(StorageError),

    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("upload failed: {0}")]
    Upload(StorageError),

    #[error("failed to mark job as ingested: {0}")]
    Acknowledge(QueueError),

    #[error("local file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs one session to completion. Never fails: problems are reported
/// through the outcome.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, id: &SessionId) -> JobOutcome;
}

pub struct JobPipeline {
    store: Arc<dyn ArtifactStore>,
    analyzer: Arc<dyn AnalysisRunner>,
    sink: Arc<dyn IngestionSink>,
    workspace: JobWorkspace,
}

impl JobPipeline {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        analyzer: Arc<dyn AnalysisRunner>,
        sink: Arc<dyn IngestionSink>,
        workspace: JobWorkspace,
    ) -> Self {
        Self {
            store,
            analyzer,
            sink,
            workspace,
        }
    }

    async fn execute(&self, id: &SessionId, files: &JobFiles) -> Result<(), PipelineError> {
        let bytes = self
            .store
            .fetch_raw(id, &files.raw)
            .await
            .map_err(PipelineError::Fetch)?;
        debug!(session_id = %id, bytes, "downloaded raw artifact");

        let document = self.analyzer.analyze(&files.raw).await?;
        debug!(session_id = %id, len = document.len(), "analysis finished");

        tokio::fs::write(&files.result, document).await?;
        self.store
            .store_result(id, &files.result)
            .await
            .map_err(PipelineError::Upload)?;
        debug!(session_id = %id, "uploaded result");

        self.sink
            .acknowledge(id)
            .await
            .map_err(PipelineError::Acknowledge)
    }
}

#[async_trait]
impl JobRunner for JobPipeline {
    async fn run(&self, id: &SessionId) -> JobOutcome {
        let files = self.workspace.claim(id);
        let result = self.execute(id, &files).await;
        drop(files);

        match result {
            Ok(()) => JobOutcome::Success,
            Err(e) => JobOutcome::failure(e.to_string()),
        }
    }
}
