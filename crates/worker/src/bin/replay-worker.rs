//! replay-worker — drains the session queue through the analysis pipeline.
//!
//! Configuration comes from the environment (and an optional `.env` file);
//! see `replay_core::config` for the keys. Flags only override: `DRAIN_MODE`
//! and `WORK_DIR` are read by `WorkerConfig` after the env file is loaded.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::Notify;
use tracing::info;

use replay_core::config::{load_dotenv, load_env_file, WorkerConfig};
use replay_queue::{http_client, HttpIngestionSink, HttpJobSource};
use replay_storage::ObjectArtifactStore;
use replay_worker::shutdown::spawn_signal_listener;
use replay_worker::{JobPipeline, JobWorkspace, NoopFailureHandler, Orchestrator, ProcessAnalysisRunner};

// ── CLI ─────────────────────────────────────────────────────────────

/// Session analysis worker.
#[derive(Parser, Debug)]
#[command(name = "replay-worker", version, about)]
struct Cli {
    /// Exit once the local queue and in-flight table are both empty.
    #[arg(long)]
    drain: bool,

    /// Working directory for transient artifacts (wiped at startup).
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Load environment from this file instead of `./.env`.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => load_env_file(path)?,
        None => load_dotenv(),
    }

    let mut config = WorkerConfig::from_env();
    if cli.drain {
        config.scheduling.drain = true;
    }
    if let Some(dir) = cli.work_dir {
        config.work_dir = dir;
    }
    config.validate()?;
    config.log_summary();

    let workspace = JobWorkspace::new(&config.work_dir, config.object_store.raw_extension.clone());
    workspace
        .prepare()
        .with_context(|| format!("preparing work dir {}", config.work_dir.display()))?;

    let client = http_client(&config.api)?;
    let source = Arc::new(HttpJobSource::new(client.clone(), &config.api)?);
    let sink = Arc::new(HttpIngestionSink::new(client, &config.api)?);
    let store = Arc::new(
        ObjectArtifactStore::from_config(&config.object_store).context("building object store client")?,
    );
    let analyzer = Arc::new(ProcessAnalysisRunner::from_config(&config.analysis));

    let pipeline = Arc::new(JobPipeline::new(store, analyzer, sink, workspace));
    let mut orchestrator = Orchestrator::new(
        config.scheduling.clone(),
        source,
        pipeline,
        Arc::new(NoopFailureHandler),
    );

    let shutdown = Arc::new(Notify::new());
    spawn_signal_listener(shutdown.clone());

    orchestrator.run(shutdown).await;
    info!("replay-worker exiting");
    Ok(())
}
