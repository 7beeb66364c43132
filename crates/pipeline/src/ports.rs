//! Port traits implemented by infrastructure crates.
//!
//! The domain states *what* it needs from the outside world; the `github`
//! crate decides *how* to supply it.

use async_trait::async_trait;

use crate::{CommitStatus, ReportError};

/// Publishes commit statuses to the source-control host.
#[async_trait]
pub trait CommitStatusPublisher: Send + Sync {
    /// Posts `status` to `statuses_url`.
    ///
    /// # Errors
    ///
    /// [`ReportError`] if the host did not answer `201 Created`. Callers log
    /// the error; it is never retried.
    async fn publish(&self, statuses_url: &str, status: &CommitStatus) -> Result<(), ReportError>;
}
