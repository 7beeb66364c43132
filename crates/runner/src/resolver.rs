//! Hook discovery.
//!
//! Hooks are found by name: every executable regular file in the hooks
//! directory whose name starts with `<event>-<owner>-<repo>` runs for a
//! matching delivery. The repository in that prefix is the one that receives
//! the commit status (head side for pushes, base side for pull requests), and
//! it must be on the configured allow-list; deliveries for any other
//! repository resolve to nothing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::Pattern;
use pipeline::{hook_prefix, EventDescriptor, HookScript, RepositorySlug};
use tracing::{debug, warn};

/// Finds the hook scripts that apply to a delivery.
#[derive(Debug, Clone)]
pub struct HookResolver {
    hooks_dir: PathBuf,
    allowed: HashSet<RepositorySlug>,
}

impl HookResolver {
    /// Creates a resolver over `hooks_dir` serving only `allowed` repositories.
    pub fn new(
        hooks_dir: impl Into<PathBuf>,
        allowed: impl IntoIterator<Item = RepositorySlug>,
    ) -> Self {
        Self {
            hooks_dir: hooks_dir.into(),
            allowed: allowed.into_iter().collect(),
        }
    }

    /// Returns `true` if `repository` is on the allow-list.
    pub fn serves(&self, repository: &RepositorySlug) -> bool {
        self.allowed.contains(repository)
    }

    /// Resolves the hooks for `descriptor`, sorted by file name.
    ///
    /// Unconfigured repositories and event kinds without a build target yield
    /// an empty list. Non-executable or non-regular entries are skipped.
    pub fn resolve(&self, descriptor: &EventDescriptor) -> Vec<HookScript> {
        let Some(repository) = descriptor.build_repository() else {
            debug!(event = %descriptor.kind, "event has no build target");
            return Vec::new();
        };
        if !self.serves(&repository) {
            debug!(%repository, "repository is not configured, ignoring delivery");
            return Vec::new();
        }

        let prefix = hook_prefix(&descriptor.kind, &repository);
        let pattern = format!(
            "{}/{}*",
            Pattern::escape(&self.hooks_dir.to_string_lossy()),
            Pattern::escape(&prefix)
        );

        let entries = match glob::glob(&pattern) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(%pattern, error = %e, "invalid hook pattern");
                return Vec::new();
            }
        };

        let mut scripts: Vec<HookScript> = entries
            .filter_map(Result::ok)
            .filter(|path| is_executable_file(path))
            .filter_map(HookScript::from_path)
            .collect();
        scripts.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(
            %repository,
            %prefix,
            hooks = scripts.len(),
            "resolved hooks"
        );
        scripts
    }
}

fn is_executable_file(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
