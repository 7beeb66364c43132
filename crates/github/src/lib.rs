//! hookci GitHub adapter.
//!
//! Implements the [`pipeline::CommitStatusPublisher`] port against the GitHub
//! REST API and manages the repository webhooks that feed the listener.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. HTTP
//! details (headers, authentication, status codes) stay here; the
//! [`pipeline`] crate never sees them.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`status`] | `GitHubStatusClient`, `DisabledPublisher` |
//! | [`webhooks`] | `WebhookRegistrar`: create/delete repository webhooks |
//! | [`errors`] | `WebhookError` |

pub mod errors;
pub mod status;
pub mod webhooks;

pub use errors::WebhookError;
pub use status::{DisabledPublisher, GitHubStatusClient};
pub use webhooks::{Registration, WebhookRegistrar};

/// `User-Agent` sent with every API request; GitHub rejects requests without one.
pub const USER_AGENT: &str = concat!("hookci/", env!("CARGO_PKG_VERSION"));

/// Media type for the GitHub REST API.
pub const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
