//! Per-run workspace directories.
//!
//! Each hook run gets a fresh directory under the configured root. The
//! directory outlives the run (its trace is served later) and is never
//! deleted by hookci.

use std::path::{Path, PathBuf};

use pipeline::{WorkspaceId, STATUS_FILE_NAME};
use tracing::debug;

use crate::RunnerError;

/// A uniquely named directory owned by one hook run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    id: WorkspaceId,
    path: PathBuf,
}

impl Workspace {
    /// Creates `<root>/<id>` for a freshly generated id.
    ///
    /// # Errors
    ///
    /// [`RunnerError::Workspace`] if the directory cannot be created.
    pub async fn create(root: &Path) -> Result<Self, RunnerError> {
        let id = WorkspaceId::generate();
        let path = root.join(id.as_str());
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|source| RunnerError::Workspace {
                root: root.to_path_buf(),
                source,
            })?;
        debug!(workspace = %id, path = %path.display(), "created workspace");
        Ok(Self { id, path })
    }

    /// Identifier (directory basename).
    pub fn id(&self) -> &WorkspaceId {
        &self.id
    }

    /// Directory location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First line of `status.txt`, if the hook wrote one and it is not blank.
    pub async fn status_override(&self) -> Option<String> {
        let bytes = tokio::fs::read(self.path.join(STATUS_FILE_NAME)).await.ok()?;
        String::from_utf8_lossy(&bytes)
            .lines()
            .next()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_makes_unique_directories() {
        let tmp = TempDir::new().unwrap();
        let a = Workspace::create(tmp.path()).await.unwrap();
        let b = Workspace::create(tmp.path()).await.unwrap();

        assert_ne!(a.id(), b.id());
        assert!(a.path().is_dir());
        assert_eq!(a.path().file_name().unwrap().to_str(), Some(a.id().as_str()));
    }

    #[tokio::test]
    async fn test_status_override_reads_first_line() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::create(tmp.path()).await.unwrap();
        assert_eq!(ws.status_override().await, None);

        std::fs::write(ws.path().join("status.txt"), "custom-status\r\nmore\n").unwrap();
        assert_eq!(ws.status_override().await.as_deref(), Some("custom-status"));

        std::fs::write(ws.path().join("status.txt"), "\n").unwrap();
        assert_eq!(ws.status_override().await, None);
    }

    #[tokio::test]
    async fn test_create_fails_under_a_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();
        let err = Workspace::create(&file).await.unwrap_err();
        assert!(matches!(err, RunnerError::Workspace { .. }));
    }
}
