use replay_core::SessionId;

/// Hook invoked for every failed job after it has been reaped and logged.
pub trait FailureHandler: Send + Sync {
    fn on_failure(&self, id: &SessionId, message: &str);
}

/// Default hook: failures are already logged by the orchestrator.
#[derive(Debug, Default)]
pub struct NoopFailureHandler;

impl FailureHandler for NoopFailureHandler {
    fn on_failure(&self, _id: &SessionId, _message: &str) {}
}
