//! Job orchestration loop.
//!
//! Each tick runs four steps in a fixed order:
//! - admission: pull candidate ids from the [`JobSource`] into the local queue
//! - dispatch: start pipelines for queued ids up to the process limit
//! - reap: collect finished pipelines without waiting on unfinished ones
//! - eviction: forget completions older than the retention window
//!
//! followed by pacing (short interval while busy, long interval when idle).
//! A session id lives in at most one of queue / in-flight at a time, and
//! completed ids suppress re-admission until they age out.


use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use indexmap::IndexSet;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use replay_core::config::SchedulingConfig;
use replay_core::SessionId;
use replay_queue::{JobSource, QueueError};

use crate::failure::FailureHandler;
use crate::outcome::JobOutcome;
use crate::pipeline::JobRunner;

/// What happened during one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub admitted: usize,
    pub dispatched: usize,
    pub reaped: usize,
    pub failed: usize,
    pub evicted: usize,
    /// The job source could not be queried this tick.
    pub source_error: bool,
}

impl TickReport {
    pub fn has_activity(&self) -> bool {
        self.admitted + self.dispatched + self.reaped + self.evicted > 0 || self.source_error
    }
}

pub struct Orchestrator {
    settings: SchedulingConfig,
    source: Arc<dyn JobSource>,
    runner: Arc<dyn JobRunner>,
    failures: Arc<dyn FailureHandler>,
    queue: IndexSet<SessionId>,
    in_flight: HashMap<SessionId, JoinHandle<JobOutcome>>,
    completed: HashMap<SessionId, DateTime<Utc>>,
}

impl Orchestrator {
    pub fn new(
        settings: SchedulingConfig,
        source: Arc<dyn JobSource>,
        runner: Arc<dyn JobRunner>,
        failures: Arc<dyn FailureHandler>,
    ) -> Self {
        Self {
            settings,
            source,
            runner,
            failures,
            queue: IndexSet::new(),
            in_flight: HashMap::new(),
            completed: HashMap::new(),
        }
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn queued(&self) -> impl Iterator<Item = &SessionId> {
        self.queue.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight(&self) -> impl Iterator<Item = &SessionId> {
        self.in_flight.keys()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// When `id` was observed to finish, if it is still remembered.
    pub fn completed_at(&self, id: &SessionId) -> Option<DateTime<Utc>> {
        self.completed.get(id).copied()
    }

    pub fn completed_len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight.is_empty()
    }

    fn is_known(&self, id: &SessionId) -> bool {
        self.queue.contains(id) || self.in_flight.contains_key(id) || self.completed.contains_key(id)
    }

    // ── Tick steps ───────────────────────────────────────────────

    /// Pull up to `query_limit` candidates and queue the ones not already
    /// queued, running, or recently completed. The queue never grows past
    /// `queue_capacity`.
    pub async fn admit(&mut self) -> Result<usize, QueueError> {
        if self.queue.len() >= self.settings.queue_capacity {
            return Ok(0);
        }

        debug!(queued = self.queue.len(), "sessions in local queue, querying for more");
        let candidates = self.source.pending(self.settings.query_limit).await?;

        let mut admitted = 0;
        let mut over_capacity = 0;
        for raw in candidates {
            let id = match SessionId::parse(raw) {
                Ok(id) => id,
                Err(e) => {
                    warn!(error = %e, "discarding invalid session id");
                    continue;
                }
            };
            if self.is_known(&id) {
                continue;
            }
            if self.queue.len() >= self.settings.queue_capacity {
                over_capacity += 1;
                continue;
            }
            self.queue.insert(id);
            admitted += 1;
        }

        if over_capacity > 0 {
            debug!(skipped = over_capacity, capacity = self.settings.queue_capacity, "queue full, candidates left upstream");
        }
        if admitted > 0 {
            info!(added = admitted, total = self.queue.len(), "added sessions to queue");
        }
        Ok(admitted)
    }

    /// Start pipelines for queued ids, oldest first, until the process
    /// limit is reached or the queue is empty.
    pub fn dispatch(&mut self) -> usize {
        let mut started = 0;
        while self.in_flight.len() < self.settings.process_limit {
            let Some(id) = self.queue.shift_remove_index(0) else {
                break;
            };
            if self.in_flight.contains_key(&id) {
                continue;
            }

            info!(session_id = %id, "starting job");
            let runner = Arc::clone(&self.runner);
            let task_id = id.clone();
            let handle = tokio::spawn(async move { runner.run(&task_id).await });
            self.in_flight.insert(id, handle);
            started += 1;
        }
        started
    }

    /// Collect every finished pipeline, recording its completion at `now`.
    /// Unfinished pipelines are left untouched.
    pub fn reap(&mut self, now: DateTime<Utc>) -> Vec<(SessionId, JobOutcome)> {
        let mut finished = Vec::new();
        for (id, handle) in self.in_flight.iter_mut() {
            if let Some(result) = handle.now_or_never() {
                finished.push((id.clone(), result));
            }
        }

        let mut outcomes = Vec::with_capacity(finished.len());
        for (id, result) in finished {
            self.in_flight.remove(&id);
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => JobOutcome::failure(format!("job task ended abnormally: {e}")),
            };

            match &outcome {
                JobOutcome::Success => info!(session_id = %id, "job completed successfully"),
                JobOutcome::Failure(message) => {
                    warn!(session_id = %id, error = %message, "job failed");
                    self.failures.on_failure(&id, message);
                }
            }
            self.completed.insert(id.clone(), now);
            outcomes.push((id, outcome));
        }
        outcomes
    }

    /// Forget completions older than the retention window. Returns how many
    /// entries were dropped.
    pub fn evict(&mut self, now: DateTime<Utc>) -> usize {
        let Ok(retention) = chrono::Duration::from_std(self.settings.retention()) else {
            return 0;
        };
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            return 0;
        };

        let before = self.completed.len();
        self.completed.retain(|_, finished_at| *finished_at >= cutoff);
        before - self.completed.len()
    }

    /// Run admission, dispatch, reap and eviction once.
    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        match self.admit().await {
            Ok(admitted) => report.admitted = admitted,
            Err(e) => {
                warn!(error = %e, "failed to get jobs for queue");
                report.source_error = true;
            }
        }

        report.dispatched = self.dispatch();

        let outcomes = self.reap(Utc::now());
        report.reaped = outcomes.len();
        report.failed = outcomes.iter().filter(|(_, o)| !o.is_success()).count();

        report.evicted = self.evict(Utc::now());
        report
    }

    /// Loop until `shutdown` is notified, or in drain mode until a tick
    /// queries the source successfully and leaves nothing queued or running.
    pub async fn run(&mut self, shutdown: Arc<Notify>) {
        info!(
            process_limit = self.settings.process_limit,
            query_limit = self.settings.query_limit,
            drain = self.settings.drain,
            "orchestrator started"
        );

        loop {
            let started = Instant::now();
            let report = self.tick().await;
            if report.has_activity() {
                debug!(
                    ?report,
                    queued = self.queue.len(),
                    in_flight = self.in_flight.len(),
                    remembered = self.completed.len(),
                    "tick finished"
                );
            }

            // A failed query says nothing about upstream emptiness.
            let idle = self.is_idle();
            if idle && self.settings.drain && !report.source_error {
                info!("queue completed");
                return;
            }

            let target = if idle {
                self.settings.long_interval
            } else {
                self.settings.short_interval
            };
            let remaining = target.saturating_sub(started.elapsed());

            tokio::select! {
                _ = tokio::time::sleep(remaining) => {}
                _ = shutdown.notified() => {
                    info!(
                        queued = self.queue.len(),
                        in_flight = self.in_flight.len(),
                        "shutdown requested, leaving orchestrator loop"
                    );
                    return;
                }
            }
        }
    }
}
