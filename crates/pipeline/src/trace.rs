//! Registry of workspaces whose traces can be served.
//!
//! Every workspace is registered under its own basename the moment it is
//! created. Entries are never removed; the registry lives as long as the
//! process. Concurrent registration and lookup are safe without the
//! execution gate.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::WorkspaceId;

/// Conventional name of the trace file a hook writes into its workspace.
pub const TRACE_FILE_NAME: &str = "trace.txt";

/// Conventional name of the file whose first line overrides the status text.
pub const STATUS_FILE_NAME: &str = "status.txt";

/// Process-wide map from [`WorkspaceId`] to workspace directory.
///
/// Cloning yields another handle to the same registry.
#[derive(Debug, Clone, Default)]
pub struct TraceStore {
    inner: Arc<RwLock<HashMap<WorkspaceId, PathBuf>>>,
}

impl TraceStore {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records where the workspace `id` lives.
    pub fn register(&self, id: WorkspaceId, path: PathBuf) {
        // A poisoned lock only means a writer panicked mid-insert; the map
        // itself is still consistent.
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.insert(id, path);
    }

    /// Returns the directory of workspace `id`, if it was registered.
    pub fn lookup(&self, id: &WorkspaceId) -> Option<PathBuf> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.get(id).cloned()
    }

    /// Location of the trace file for workspace `id`, if it was registered.
    ///
    /// The file itself may not exist.
    pub fn trace_path(&self, id: &WorkspaceId) -> Option<PathBuf> {
        self.lookup(id).map(|dir| dir.join(TRACE_FILE_NAME))
    }

    /// Number of registered workspaces.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns `true` if no workspace has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
