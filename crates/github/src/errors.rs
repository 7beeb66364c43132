//! Error types for webhook management.
//!
//! Commit-status failures use [`pipeline::ReportError`], since they cross the
//! port boundary.

use pipeline::RepositorySlug;
use thiserror::Error;

/// Failure to list, create, or delete a repository webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// GitHub answered with a status the operation does not accept.
    #[error("GitHub returned {status} for {repository}: {body}")]
    UnexpectedStatus {
        /// Repository whose hooks were being managed.
        repository: RepositorySlug,
        /// HTTP status code of the response.
        status: u16,
        /// Response body, for diagnosis.
        body: String,
    },

    /// The request never produced a response, or the body did not parse.
    #[error("webhook request for {repository} failed")]
    Transport {
        /// Repository whose hooks were being managed.
        repository: RepositorySlug,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
}
