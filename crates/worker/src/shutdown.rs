//! Process-level stop signal.

use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{info, warn};

/// Spawn a task that notifies `shutdown` on SIGINT/SIGTERM (Ctrl+C on
/// other platforms). The permit is stored, so a signal arriving mid-tick
/// is still observed at the next pacing sleep.
pub fn spawn_signal_listener(shutdown: Arc<Notify>) {
    tokio::spawn(async move {
        os_signal().await;
        info!("shutdown signal received");
        shutdown.notify_one();
    });
}

/// Wait for SIGINT or SIGTERM (Unix) or Ctrl+C (cross-platform fallback).
async fn os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "failed to register unix signal handlers, falling back to ctrl_c");
            }
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl_c; shutdown only by process kill");
        std::future::pending::<()>().await;
    }
}
