//! Local working directory for transient artifacts.
//!
//! ```text
//! <work_dir>/
//!   raw/<id>.<ext>      downloaded raw artifacts
//!   results/<id>.json   analyzer output awaiting upload
//! ```

use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use replay_core::SessionId;

#[derive(Debug, Clone)]
pub struct JobWorkspace {
    root: PathBuf,
    raw_extension: String,
}

impl JobWorkspace {
    pub fn new(root: impl Into<PathBuf>, raw_extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            raw_extension: raw_extension.into(),
        }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn result_dir(&self) -> PathBuf {
        self.root.join("results")
    }

    /// Wipe and recreate the working directory. Leftovers from a previous
    /// run are never reused.
    pub fn prepare(&self) -> io::Result<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
        }
        std::fs::create_dir_all(self.raw_dir())?;
        std::fs::create_dir_all(self.result_dir())?;
        info!(root = %self.root.display(), "working directory prepared");
        Ok(())
    }

    pub fn raw_path(&self, id: &SessionId) -> PathBuf {
        self.raw_dir().join(format!("{}.{}", id, self.raw_extension))
    }

    pub fn result_path(&self, id: &SessionId) -> PathBuf {
        self.result_dir().join(format!("{id}.json"))
    }

    /// Reserve the local paths for one job. Both files are removed when the
    /// returned guard is dropped.
    pub fn claim(&self, id: &SessionId) -> JobFiles {
        JobFiles {
            raw: self.raw_path(id),
            result: self.result_path(id),
        }
    }
}

/// Per-job local paths, deleted on drop.
///
/// Removal uses blocking `std::fs` calls: drop cannot await, and two unlinks
/// are cheap enough to run on the runtime thread.
#[derive(Debug)]
pub struct JobFiles {
    pub raw: PathBuf,
    pub result: PathBuf,
}

impl Drop for JobFiles {
    fn drop(&mut self) {
        remove_if_present(&self.raw);
        remove_if_present(&self.result);
    }
}

fn remove_if_present(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove temp file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_wipes_previous_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = JobWorkspace::new(tmp.path().join("work"), "dem");
        ws.prepare().unwrap();
        std::fs::write(ws.raw_dir().join("stale.dem"), b"x").unwrap();

        ws.prepare().unwrap();

        assert!(ws.raw_dir().is_dir());
        assert!(ws.result_dir().is_dir());
        assert!(!ws.raw_dir().join("stale.dem").exists());
    }

    #[test]
    fn paths_are_namespaced_per_session() {
        let ws = JobWorkspace::new("/work", "dem");
        let a = SessionId::parse("a").unwrap();
        let b = SessionId::parse("b").unwrap();
        assert_eq!(ws.raw_path(&a), PathBuf::from("/work/raw/a.dem"));
        assert_eq!(ws.result_path(&a), PathBuf::from("/work/results/a.json"));
        assert_ne!(ws.raw_path(&a), ws.raw_path(&b));
    }

    #[test]
    fn dropping_claim_removes_files() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = JobWorkspace::new(tmp.path(), "dem");
        ws.prepare().unwrap();
        let id = SessionId::parse("s1").unwrap();

        let files = ws.claim(&id);
        std::fs::write(&files.raw, b"raw").unwrap();
        std::fs::write(&files.result, b"{}").unwrap();
        drop(files);

        assert!(!ws.raw_path(&id).exists());
        assert!(!ws.result_path(&id).exists());
    }

    #[test]
    fn dropping_claim_without_files_is_quiet() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = JobWorkspace::new(tmp.path(), "dem");
        drop(ws.claim(&SessionId::parse("never-written").unwrap()));
    }
}
