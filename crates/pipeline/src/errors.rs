//! Top-level error types for the hookci domain.
//!
//! [`PipelineError`] covers conditions raised while turning a delivery into
//! work: payloads that cannot be understood and invalid configuration.
//! [`ReportError`] is returned by [`crate::CommitStatusPublisher`]
//! implementations. Execution-side errors live in the `runner` crate.
//!
//! Nothing in hookci is retried; every error here is final for the attempt
//! that produced it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Pipeline-level errors
// ---------------------------------------------------------------------------

/// Errors that stop a delivery from being turned into tasks.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// The payload is not valid JSON or lacks the object that identifies the
    /// repository at all.
    ///
    /// Surfaced only to the immediate extraction caller. Missing optional
    /// fields are never reported this way; they default to `"unknown"`.
    #[error("Malformed payload: {reason}")]
    MalformedPayload {
        /// What made the payload unusable.
        reason: String,
    },

    /// The server configuration is invalid.
    ///
    /// Produced at load time; the server never starts with an invalid config.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Reporting errors
// ---------------------------------------------------------------------------

/// A commit-status report did not succeed.
///
/// Fatal only to the report attempt that produced it; the task's workspace
/// and trace remain inspectable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    /// The host answered with something other than `201 Created`.
    #[error("Commit status rejected with HTTP {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code returned by the host.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The request could not be delivered at all.
    #[error("Commit status request failed: {message}")]
    Transport {
        /// Underlying transport error message.
        message: String,
    },
}
