//! Shared value types for the hookci domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants and participate in domain computations:
//! the outcome of one hook run and the commit status derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status text used when a script printed nothing usable.
pub const NO_OUTPUT: &str = "no output";

// ---------------------------------------------------------------------------
// Task results
// ---------------------------------------------------------------------------

/// Outcome of one hook script execution.
///
/// Produced exactly once per run and consumed exactly once by the status
/// reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// One-line summary shown as the commit-status description.
    pub status_text: String,

    /// Process exit code. Processes terminated by a signal report
    /// `-<signal>`, so a watchdog kill shows up as `-9`.
    pub exit_code: i32,

    /// `true` if the watchdog killed the script.
    ///
    /// Informational only: a timeout is reported exactly like any other
    /// non-zero exit.
    pub timed_out: bool,

    /// When the subprocess was started.
    pub started_at: Timestamp,

    /// When the subprocess was reaped.
    pub finished_at: Timestamp,
}

impl TaskResult {
    /// Returns `true` if the script exited with code zero.
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Derives the status text from a script's captured stdout.
///
/// By convention the status is the last line: the final `\n`-separated
/// segment if non-empty, otherwise the one before it if non-empty, otherwise
/// [`NO_OUTPUT`].
pub fn status_text_from_output(stdout: &str) -> String {
    let segments: Vec<&str> = stdout.split('\n').collect();
    let last = segments.last().copied().unwrap_or_default();
    if !last.is_empty() {
        return last.to_string();
    }
    match segments.len().checked_sub(2).map(|i| segments[i]) {
        Some(prior) if !prior.is_empty() => prior.to_string(),
        _ => NO_OUTPUT.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Commit statuses
// ---------------------------------------------------------------------------

/// Commit-status state posted to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    /// The hook exited with code zero.
    Success,
    /// The hook exited non-zero, was killed, or could not be started.
    Failure,
}

impl std::fmt::Display for CommitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failure => f.write_str("failure"),
        }
    }
}

/// Body of a commit-status call: `{state, context, description, target_url}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    /// Pass/fail.
    pub state: CommitState,
    /// Hook script basename; distinguishes statuses on the same commit.
    pub context: String,
    /// Status text of the run (may be empty).
    pub description: String,
    /// Link to the run's trace.
    pub target_url: String,
}

impl CommitStatus {
    /// Builds the status for a finished run.
    ///
    /// `target_url` is `<trace_base_url>/<workspace_id>`.
    pub fn for_result(
        context: impl Into<String>,
        result: &TaskResult,
        trace_base_url: &str,
        workspace_id: &crate::WorkspaceId,
    ) -> Self {
        let state = if result.succeeded() {
            CommitState::Success
        } else {
            CommitState::Failure
        };
        Self {
            state,
            context: context.into(),
            description: result.status_text.clone(),
            target_url: format!("{}/{}", trace_base_url.trim_end_matches('/'), workspace_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
