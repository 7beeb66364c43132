//! Newtype domain identifiers.
//!
//! Workspaces, hooks and deliveries are each named by their own string
//! newtype, so a [`WorkspaceId`] cannot be passed where a [`HookName`] is
//! expected. [`RepositorySlug`] is a validated `owner/repo` pair.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::PipelineError;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// String-backed identifiers
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a per-run workspace directory by its basename.
    ///
    /// The same value keys the [`crate::TraceStore`] and forms the last path
    /// segment of the trace link attached to a commit status.
    WorkspaceId
}

impl WorkspaceId {
    /// Generates a fresh, unique workspace identifier (`hookci-<uuid>`).
    pub fn generate() -> Self {
        Self(format!("hookci-{}", Uuid::new_v4()))
    }
}

string_id! {
    /// The basename of a hook script, used as the commit-status context.
    HookName
}

string_id! {
    /// Identifies one webhook delivery, as sent in `X-GitHub-Delivery`.
    DeliveryId
}

// ---------------------------------------------------------------------------
// Repository slug
// ---------------------------------------------------------------------------

/// Identifies a GitHub repository in `"owner/repo"` format.
///
/// Both halves are guaranteed non-empty and the owner contains no `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositorySlug {
    owner: String,
    repo: String,
}

impl RepositorySlug {
    /// Creates a slug from its two halves, returning `None` if either is empty
    /// or contains a `/`.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Option<Self> {
        let owner = owner.into();
        let repo = repo.into();
        if owner.is_empty() || repo.is_empty() || owner.contains('/') || repo.contains('/') {
            return None;
        }
        Some(Self { owner, repo })
    }

    /// Repository owner (user or organisation login).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// The `owner-repo` fragment used in hook file names.
    pub fn hook_fragment(&self) -> String {
        format!("{}-{}", self.owner, self.repo)
    }
}

impl FromStr for RepositorySlug {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_once('/')
            .and_then(|(owner, repo)| Self::new(owner, repo))
            .ok_or_else(|| PipelineError::ConfigurationError {
                message: format!("'{s}' is not an owner/repo slug"),
            })
    }
}

impl TryFrom<String> for RepositorySlug {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepositorySlug> for String {
    fn from(slug: RepositorySlug) -> Self {
        slug.to_string()
    }
}

impl std::fmt::Display for RepositorySlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
