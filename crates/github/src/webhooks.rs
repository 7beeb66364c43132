//! Repository webhook registration.
//!
//! On startup the server can point each configured repository at its public
//! URL, and remove those hooks again on shutdown. A hook is identified by its
//! `config.url`; any hook already delivering to the public URL is reused, so
//! registering twice does not duplicate deliveries.

use pipeline::RepositorySlug;
use reqwest::header::{ACCEPT, USER_AGENT as USER_AGENT_HEADER};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{WebhookError, GITHUB_MEDIA_TYPE, USER_AGENT};

/// Events every registered hook subscribes to.
pub const WEBHOOK_EVENTS: [&str; 2] = ["push", "pull_request"];

/// Result of [`WebhookRegistrar::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new hook was created with this id.
    Created(u64),
    /// A hook with this id already delivers to the public URL.
    AlreadyPresent(u64),
}

#[derive(Debug, Deserialize)]
struct RepoHook {
    id: u64,
    #[serde(default)]
    config: RepoHookConfig,
}

#[derive(Debug, Default, Deserialize)]
struct RepoHookConfig {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedHook {
    id: u64,
}

/// Creates and deletes repository webhooks targeting `public_url`.
#[derive(Clone)]
pub struct WebhookRegistrar {
    client: Client,
    api_base: String,
    token: String,
    public_url: String,
}

impl std::fmt::Debug for WebhookRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookRegistrar")
            .field("api_base", &self.api_base)
            .field("public_url", &self.public_url)
            .finish_non_exhaustive()
    }
}

impl WebhookRegistrar {
    /// Creates a registrar talking to `api_base` that points hooks at
    /// `public_url`.
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            public_url: public_url.into(),
        }
    }

    /// Ensures `repository` has a hook delivering to the public URL.
    ///
    /// # Errors
    ///
    /// [`WebhookError`] if listing or creating hooks fails.
    pub async fn register(&self, repository: &RepositorySlug) -> Result<Registration, WebhookError> {
        if let Some(existing) = self
            .list(repository)
            .await?
            .into_iter()
            .find(|hook| self.targets_us(hook))
        {
            return Ok(Registration::AlreadyPresent(existing.id));
        }

        let body = serde_json::json!({
            "name": "web",
            "active": true,
            "events": WEBHOOK_EVENTS,
            "config": {
                "url": self.public_url,
                "content_type": "json",
            },
        });
        let response = self
            .request(self.client.post(self.hooks_url(repository)))
            .json(&body)
            .send()
            .await
            .map_err(transport(repository))?;
        let response = expect_status(repository, response, StatusCode::CREATED).await?;
        let created: CreatedHook = response.json().await.map_err(transport(repository))?;
        Ok(Registration::Created(created.id))
    }

    /// Deletes every hook of `repository` delivering to the public URL and
    /// returns how many were removed.
    ///
    /// # Errors
    ///
    /// [`WebhookError`] if listing or deleting hooks fails.
    pub async fn unregister(&self, repository: &RepositorySlug) -> Result<usize, WebhookError> {
        let ours: Vec<RepoHook> = self
            .list(repository)
            .await?
            .into_iter()
            .filter(|hook| self.targets_us(hook))
            .collect();

        for hook in &ours {
            let url = format!("{}/{}", self.hooks_url(repository), hook.id);
            let response = self
                .request(self.client.delete(url))
                .send()
                .await
                .map_err(transport(repository))?;
            expect_status(repository, response, StatusCode::NO_CONTENT).await?;
        }
        Ok(ours.len())
    }

    /// Registers every repository, logging failures without stopping.
    /// Returns the repositories that now have a hook.
    pub async fn register_all<'a>(
        &self,
        repositories: impl IntoIterator<Item = &'a RepositorySlug>,
    ) -> Vec<RepositorySlug> {
        let mut registered = Vec::new();
        for repository in repositories {
            match self.register(repository).await {
                Ok(Registration::Created(id)) => {
                    info!(%repository, hook_id = id, url = %self.public_url, "webhook created");
                    registered.push(repository.clone());
                }
                Ok(Registration::AlreadyPresent(id)) => {
                    info!(%repository, hook_id = id, "webhook already present");
                    registered.push(repository.clone());
                }
                Err(e) => warn!(%repository, error = %e, "webhook registration failed"),
            }
        }
        registered
    }

    /// Unregisters every repository, logging failures without stopping.
    pub async fn unregister_all<'a>(
        &self,
        repositories: impl IntoIterator<Item = &'a RepositorySlug>,
    ) {
        for repository in repositories {
            match self.unregister(repository).await {
                Ok(removed) => info!(%repository, removed, "webhooks removed"),
                Err(e) => warn!(%repository, error = %e, "webhook removal failed"),
            }
        }
    }

    async fn list(&self, repository: &RepositorySlug) -> Result<Vec<RepoHook>, WebhookError> {
        let response = self
            .request(self.client.get(self.hooks_url(repository)))
            .send()
            .await
            .map_err(transport(repository))?;
        let response = expect_status(repository, response, StatusCode::OK).await?;
        response.json().await.map_err(transport(repository))
    }

    fn targets_us(&self, hook: &RepoHook) -> bool {
        hook.config.url.as_deref() == Some(self.public_url.as_str())
    }

    fn hooks_url(&self, repository: &RepositorySlug) -> String {
        format!(
            "{}/repos/{}/{}/hooks",
            self.api_base,
            repository.owner(),
            repository.repo()
        )
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header(USER_AGENT_HEADER, USER_AGENT)
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
    }
}

fn transport(repository: &RepositorySlug) -> impl FnOnce(reqwest::Error) -> WebhookError + '_ {
    move |source| WebhookError::Transport {
        repository: repository.clone(),
        source,
    }
}

async fn expect_status(
    repository: &RepositorySlug,
    response: reqwest::Response,
    expected: StatusCode,
) -> Result<reqwest::Response, WebhookError> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(WebhookError::UnexpectedStatus {
        repository: repository.clone(),
        status: status.as_u16(),
        body,
    })
}
