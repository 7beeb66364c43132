//! Commit-status publishers.

use async_trait::async_trait;
use pipeline::{CommitStatus, CommitStatusPublisher, ReportError};
use reqwest::header::{ACCEPT, USER_AGENT as USER_AGENT_HEADER};
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::{GITHUB_MEDIA_TYPE, USER_AGENT};

/// Posts commit statuses with a personal access token.
///
/// GitHub answers a created status with `201 Created`; every other response
/// is an [`ReportError::UnexpectedStatus`]. Nothing is retried.
#[derive(Clone)]
pub struct GitHubStatusClient {
    client: Client,
    token: String,
}

impl std::fmt::Debug for GitHubStatusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubStatusClient").finish_non_exhaustive()
    }
}

impl GitHubStatusClient {
    /// Creates a client authenticating with `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), token)
    }

    /// Reuses an existing connection pool.
    pub fn with_client(client: Client, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
        }
    }
}

#[async_trait]
impl CommitStatusPublisher for GitHubStatusClient {
    async fn publish(&self, statuses_url: &str, status: &CommitStatus) -> Result<(), ReportError> {
        let response = self
            .client
            .post(statuses_url)
            .bearer_auth(&self.token)
            .header(USER_AGENT_HEADER, USER_AGENT)
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .json(status)
            .send()
            .await
            .map_err(|e| ReportError::Transport {
                message: e.to_string(),
            })?;

        let code = response.status();
        if code == StatusCode::CREATED {
            debug!(url = statuses_url, context = %status.context, "status created");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ReportError::UnexpectedStatus {
            status: code.as_u16(),
            body,
        })
    }
}

/// Used when no token is configured: logs the status instead of posting it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPublisher;

#[async_trait]
impl CommitStatusPublisher for DisabledPublisher {
    async fn publish(&self, statuses_url: &str, status: &CommitStatus) -> Result<(), ReportError> {
        info!(
            url = statuses_url,
            context = %status.context,
            state = %status.state,
            description = %status.description,
            "status reporting disabled, not posting"
        );
        Ok(())
    }
}
