//! Event descriptors and their extraction from raw webhook payloads.
//!
//! A delivery's JSON payload is reduced to an [`EventDescriptor`]: the handful
//! of fields a hook script needs (who pushed what, where, and where to report
//! the result). Extraction is deliberately lenient: any leaf the payload does
//! not carry becomes [`UNKNOWN`], because the host expects a fast
//! acknowledgment whatever happens downstream. Only a payload that is not JSON,
//! or that has no repository identity at all, is rejected.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{PipelineError, RepositorySlug};

/// Sentinel used for every descriptor field the payload does not provide.
pub const UNKNOWN: &str = "unknown";

/// Default GitHub REST API base used to construct push `statuses_url`s.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

// ---------------------------------------------------------------------------
// Event kind
// ---------------------------------------------------------------------------

/// The webhook event type, as sent in the `X-GitHub-Event` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// `push`
    Push,
    /// `pull_request`
    PullRequest,
    /// Any other event (`ping`, `issues`, ...). Accepted but never acted on.
    Other(String),
}

impl EventKind {
    /// Parses a header value into an [`EventKind`]. Never fails.
    pub fn parse(value: &str) -> Self {
        match value {
            "push" => Self::Push,
            "pull_request" => Self::PullRequest,
            other => Self::Other(other.to_string()),
        }
    }

    /// The wire name of this event kind; also the hook file name prefix.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Push => "push",
            Self::PullRequest => "pull_request",
            Self::Other(name) => name,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Base-side coordinates of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRefs {
    /// Owner of the repository the pull request targets.
    pub base_owner: String,
    /// Name of the repository the pull request targets.
    pub base_repo: String,
    /// Pull request number, stringified.
    pub pr_number: String,
}

/// Normalised, immutable summary of one delivery.
///
/// Shared read-only by every hook task spawned for that delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    /// Which event produced this descriptor.
    pub kind: EventKind,
    /// Head-side repository owner.
    pub owner: String,
    /// Head-side repository name.
    pub repo: String,
    /// Branch that was pushed, or the pull request's head branch.
    pub branch: String,
    /// Head commit SHA.
    pub commit: String,
    /// Where the commit status for this delivery is posted.
    pub statuses_url: String,
    /// Location of the stored raw payload; hook argument 1.
    pub payload_path: PathBuf,
    /// Present only for [`EventKind::PullRequest`].
    pub pull_request: Option<PullRequestRefs>,
}

impl EventDescriptor {
    /// A descriptor with only the kind and payload location populated.
    fn bare(kind: EventKind, payload_path: PathBuf) -> Self {
        Self {
            kind,
            owner: UNKNOWN.to_string(),
            repo: UNKNOWN.to_string(),
            branch: UNKNOWN.to_string(),
            commit: UNKNOWN.to_string(),
            statuses_url: UNKNOWN.to_string(),
            payload_path,
            pull_request: None,
        }
    }

    /// `(owner, repo)` of the repository that receives the commit status:
    /// the head side for pushes, the base side for pull requests.
    ///
    /// `None` for event kinds that are never built.
    pub fn build_target(&self) -> Option<(&str, &str)> {
        match (&self.kind, &self.pull_request) {
            (EventKind::Push, _) => Some((self.owner.as_str(), self.repo.as_str())),
            (EventKind::PullRequest, Some(pr)) => {
                Some((pr.base_owner.as_str(), pr.base_repo.as_str()))
            }
            _ => None,
        }
    }

    /// The build target as a validated slug, if it forms one.
    pub fn build_repository(&self) -> Option<RepositorySlug> {
        self.build_target()
            .and_then(|(owner, repo)| RepositorySlug::new(owner, repo))
    }

    /// Positional arguments handed to a direct-mode hook.
    ///
    /// Push: `payload_path, "push", owner, repo, branch, commit`.
    /// Pull request: the same followed by `base_owner, base_repo, pr_number`.
    pub fn arguments(&self) -> Vec<String> {
        let mut args = vec![
            self.payload_path.display().to_string(),
            self.kind.as_str().to_string(),
            self.owner.clone(),
            self.repo.clone(),
            self.branch.clone(),
            self.commit.clone(),
        ];
        if let Some(pr) = &self.pull_request {
            args.extend([
                pr.base_owner.clone(),
                pr.base_repo.clone(),
                pr.pr_number.clone(),
            ]);
        }
        args
    }

    /// Named variables exposed to shell-mode hooks through the environment.
    pub fn variables(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![
            ("payload_path", self.payload_path.display().to_string()),
            ("event_type", self.kind.as_str().to_string()),
            ("owner", self.owner.clone()),
            ("repo", self.repo.clone()),
            ("branch", self.branch.clone()),
            ("commit", self.commit.clone()),
            ("statuses_url", self.statuses_url.clone()),
        ];
        if let Some((build_owner, build_repo)) = self.build_target() {
            vars.push(("build_owner", build_owner.to_string()));
            vars.push(("build_repo", build_repo.to_string()));
        }
        if let Some(pr) = &self.pull_request {
            vars.push(("base_owner", pr.base_owner.clone()));
            vars.push(("base_repo", pr.base_repo.clone()));
            vars.push(("pr_number", pr.pr_number.clone()));
        }
        // Same slug variable Travis CI exposes, so existing scripts port over.
        vars.push(("TRAVIS_REPO_SLUG", format!("{}/{}", self.owner, self.repo)));
        vars
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Turns raw webhook payloads into [`EventDescriptor`]s.
#[derive(Debug, Clone)]
pub struct DescriptorExtractor {
    api_base: String,
}

impl Default for DescriptorExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl DescriptorExtractor {
    /// Creates an extractor that builds push `statuses_url`s under `api_base`.
    pub fn new(api_base: impl Into<String>) -> Self {
        let api_base = api_base.into();
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Parses `raw_payload` as JSON and extracts a descriptor.
    ///
    /// # Errors
    ///
    /// [`PipelineError::MalformedPayload`] if the bytes are not JSON or the
    /// payload carries no repository identity.
    pub fn extract(
        &self,
        kind: &EventKind,
        raw_payload: &[u8],
        payload_path: impl Into<PathBuf>,
    ) -> Result<EventDescriptor, PipelineError> {
        let payload: Value =
            serde_json::from_slice(raw_payload).map_err(|e| PipelineError::MalformedPayload {
                reason: format!("not valid JSON: {e}"),
            })?;
        self.extract_value(kind, &payload, payload_path)
    }

    /// Extracts a descriptor from an already-parsed payload.
    ///
    /// # Errors
    ///
    /// [`PipelineError::MalformedPayload`] if the payload carries no
    /// repository identity.
    pub fn extract_value(
        &self,
        kind: &EventKind,
        payload: &Value,
        payload_path: impl Into<PathBuf>,
    ) -> Result<EventDescriptor, PipelineError> {
        let payload_path = payload_path.into();
        match kind {
            EventKind::Push => self.extract_push(payload, payload_path),
            EventKind::PullRequest => extract_pull_request(payload, payload_path),
            EventKind::Other(_) => Ok(EventDescriptor::bare(kind.clone(), payload_path)),
        }
    }

    fn extract_push(
        &self,
        payload: &Value,
        payload_path: PathBuf,
    ) -> Result<EventDescriptor, PipelineError> {
        let repository = require_object(payload, "repository")?;

        let owner = owner_name(repository.get("owner"));
        let repo = leaf(repository, "/name");
        let branch = payload
            .get("ref")
            .and_then(Value::as_str)
            .and_then(|r| r.split('/').nth(2))
            .unwrap_or(UNKNOWN)
            .to_string();
        let commit = leaf(payload, "/head_commit/id");
        let statuses_url = format!(
            "{}/repos/{}/{}/statuses/{}",
            self.api_base, owner, repo, commit
        );

        Ok(EventDescriptor {
            kind: EventKind::Push,
            owner,
            repo,
            branch,
            commit,
            statuses_url,
            payload_path,
            pull_request: None,
        })
    }
}

fn extract_pull_request(
    payload: &Value,
    payload_path: PathBuf,
) -> Result<EventDescriptor, PipelineError> {
    let pr = require_object(payload, "pull_request")?;

    Ok(EventDescriptor {
        kind: EventKind::PullRequest,
        owner: owner_name(pr.pointer("/head/repo/owner")),
        repo: leaf(pr, "/head/repo/name"),
        branch: leaf(pr, "/head/ref"),
        commit: leaf(pr, "/head/sha"),
        statuses_url: leaf(pr, "/statuses_url"),
        payload_path,
        pull_request: Some(PullRequestRefs {
            base_owner: owner_name(pr.pointer("/base/repo/owner")),
            base_repo: leaf(pr, "/base/repo/name"),
            pr_number: leaf(pr, "/number"),
        }),
    })
}

fn require_object<'a>(payload: &'a Value, key: &str) -> Result<&'a Value, PipelineError> {
    payload
        .get(key)
        .filter(|v| v.is_object())
        .ok_or_else(|| PipelineError::MalformedPayload {
            reason: format!("payload has no '{key}' object"),
        })
}

/// Reads a string or number leaf, defaulting to [`UNKNOWN`].
fn leaf(value: &Value, pointer: &str) -> String {
    match value.pointer(pointer) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// Push payloads name the owner in `name`; API-shaped objects use `login`.
fn owner_name(owner: Option<&Value>) -> String {
    let Some(owner) = owner else {
        return UNKNOWN.to_string();
    };
    match owner.get("name").and_then(Value::as_str) {
        Some(name) => name.to_string(),
        None => leaf(owner, "/login"),
    }
}
