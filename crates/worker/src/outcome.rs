use std::fmt;

/// Result of one pipeline run. Failures carry a non-empty, human-readable
/// description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Failure(String),
}

impl JobOutcome {
    /// Empty messages are replaced so a failure can never look like success.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.is_empty() {
            JobOutcome::Failure("unknown error".to_string())
        } else {
            JobOutcome::Failure(message)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success)
    }

    /// `""` on success, the failure description otherwise.
    pub fn message(&self) -> &str {
        match self {
            JobOutcome::Success => "",
            JobOutcome::Failure(msg) => msg,
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Success => f.write_str("success"),
            JobOutcome::Failure(msg) => write!(f, "failure: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_failure_message_is_never_success_shaped() {
        let outcome = JobOutcome::failure("");
        assert!(!outcome.is_success());
        assert!(!outcome.message().is_empty());
    }

    #[test]
    fn message_shapes() {
        assert_eq!(JobOutcome::Success.message(), "");
        assert_eq!(JobOutcome::failure("boom").message(), "boom");
    }
}
