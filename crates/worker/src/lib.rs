//! Session processing worker.
//!
//! Drains a remote queue of session ids through a fixed pipeline (fetch raw
//! artifact, run the external analyzer, upload the result, acknowledge
//! ingestion) with a bounded number of concurrently running jobs.

pub mod analysis;
pub mod failure;
pub mod orchestrator;
pub mod outcome;
pub mod pipeline;
pub mod shutdown;
pub mod workspace;

pub use analysis::{AnalysisError, AnalysisRunner, ProcessAnalysisRunner};
pub use failure::{FailureHandler, NoopFailureHandler};
pub use orchestrator::{Orchestrator, TickReport};
pub use outcome::JobOutcome;
pub use pipeline::{JobPipeline, JobRunner, PipelineError};
pub use workspace::{JobFiles, JobWorkspace};
