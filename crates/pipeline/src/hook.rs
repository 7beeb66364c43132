//! Hook scripts discovered on disk.
//!
//! A hook is an executable whose file name encodes the event and repository
//! it reacts to: `<event>-<owner>-<repo>[-<suffix>]`. The `.sh` suffix marks a
//! [`ExecutionMode::Shell`] hook that is fed to an interpreter after a
//! generated checkout block; everything else is executed directly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{EventKind, HookName, RepositorySlug};

/// File-name suffix that selects [`ExecutionMode::Shell`].
pub const SHELL_SUFFIX: &str = ".sh";

/// How a hook script is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Executed as a program; descriptor fields are positional arguments.
    Direct,
    /// Piped into a shell after variables are set and the code is checked out.
    Shell,
}

/// A hook script selected for one delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookScript {
    /// Location of the script.
    pub path: PathBuf,
    /// Basename of `path`; the commit-status context.
    pub name: HookName,
    /// Derived from the file name.
    pub mode: ExecutionMode,
}

impl HookScript {
    /// Builds a [`HookScript`] from its path.
    ///
    /// Returns `None` if the path has no usable file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let file_name = path.file_name()?.to_str()?.to_string();
        let mode = if file_name.ends_with(SHELL_SUFFIX) {
            ExecutionMode::Shell
        } else {
            ExecutionMode::Direct
        };
        let name = HookName::new(file_name)?;
        Some(Self { path, name, mode })
    }

    /// The script's location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// File-name prefix shared by every hook for `kind` on `repository`:
/// `<event>-<owner>-<repo>`.
pub fn hook_prefix(kind: &EventKind, repository: &RepositorySlug) -> String {
    format!("{}-{}", kind.as_str(), repository.hook_fragment())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_suffix_selects_shell_mode() {
        let hook = HookScript::from_path("/hooks/push-a-b-build.sh").unwrap();
        assert_eq!(hook.mode, ExecutionMode::Shell);
        assert_eq!(hook.name.as_str(), "push-a-b-build.sh");
    }

    #[test]
    fn test_other_names_select_direct_mode() {
        let hook = HookScript::from_path("/hooks/push-a-b").unwrap();
        assert_eq!(hook.mode, ExecutionMode::Direct);
        let hook = HookScript::from_path("/hooks/push-a-b-sh").unwrap();
        assert_eq!(hook.mode, ExecutionMode::Direct);
    }

    #[test]
    fn test_prefix_uses_wire_event_name() {
        let repo: RepositorySlug = "INRIA/spoon".parse().unwrap();
        assert_eq!(
            hook_prefix(&EventKind::PullRequest, &repo),
            "pull_request-INRIA-spoon"
        );
    }
}
