//! External analyzer invocation.
//!
//! Runs the analysis executable directly (no shell) as
//! `<exe> -q -i <artifact>` and captures stdout as the result document.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use replay_core::config::AnalysisConfig;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),

    #[error("analyzer exited with {}: {stderr}", .code.map_or_else(|| "signal".to_string(), |c| format!("code {c}")))]
    Exit { code: Option<i32>, stderr: String },

    #[error("analyzer output is not valid UTF-8")]
    InvalidOutput,

    #[error("analyzer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a local raw artifact into a result document.
#[async_trait]
pub trait AnalysisRunner: Send + Sync {
    async fn analyze(&self, input: &Path) -> Result<String, AnalysisError>;
}

pub struct ProcessAnalysisRunner {
    executable: PathBuf,
    timeout: Duration,
}

impl ProcessAnalysisRunner {
    pub fn new(executable: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            timeout,
        }
    }

    pub fn from_config(cfg: &AnalysisConfig) -> Self {
        Self::new(cfg.executable.clone(), cfg.timeout)
    }
}

#[async_trait]
impl AnalysisRunner for ProcessAnalysisRunner {
    async fn analyze(&self, input: &Path) -> Result<String, AnalysisError> {
        debug!(
            executable = %self.executable.display(),
            input = %input.display(),
            timeout = ?self.timeout,
            "running analyzer"
        );

        // kill_on_drop: the child is killed when the timed-out wait is dropped.
        let child = Command::new(&self.executable)
            .arg("-q")
            .arg("-i")
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AnalysisError::Spawn {
                program: self.executable.display().to_string(),
                reason: e.to_string(),
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(input = %input.display(), timeout = ?self.timeout, "analyzer timed out");
                return Err(AnalysisError::Timeout(self.timeout));
            }
        };

        if !output.status.success() {
            return Err(AnalysisError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| AnalysisError::InvalidOutput)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("analyzer.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn captures_stdout_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), r#"printf '{"ok":true}'"#);
        let runner = ProcessAnalysisRunner::new(exe, Duration::from_secs(5));

        let doc = runner.analyze(&dir.path().join("s1.dem")).await.unwrap();
        assert_eq!(doc, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn passes_quiet_and_input_flags() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), r#"printf '%s|' "$@""#);
        let runner = ProcessAnalysisRunner::new(exe, Duration::from_secs(5));
        let input = dir.path().join("s1.dem");

        let doc = runner.analyze(&input).await.unwrap();
        assert_eq!(doc, format!("-q|-i|{}|", input.display()));
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "echo partial; echo 'corrupt demo' >&2; exit 3");
        let runner = ProcessAnalysisRunner::new(exe, Duration::from_secs(5));

        let err = runner.analyze(&dir.path().join("x.dem")).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Exit { code: Some(3), .. }));
        assert!(err.to_string().contains("corrupt demo"));
    }

    #[tokio::test]
    async fn slow_analyzer_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "sleep 5");
        let runner = ProcessAnalysisRunner::new(exe, Duration::from_millis(200));

        let err = runner.analyze(&dir.path().join("x.dem")).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Timeout(_)));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn missing_executable_is_a_spawn_failure() {
        let runner = ProcessAnalysisRunner::new("/nonexistent/analyzer", Duration::from_secs(1));
        let err = runner.analyze(Path::new("/tmp/x.dem")).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Spawn { .. }));
    }
}
