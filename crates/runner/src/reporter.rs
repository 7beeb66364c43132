//! Commit-status reporting for finished runs.

use std::sync::Arc;

use pipeline::{
    CommitStatus, CommitStatusPublisher, EventDescriptor, HookName, ReportError, TaskResult,
    WorkspaceId,
};
use tracing::{info, info_span, Instrument};

/// Turns task results into commit-status calls.
#[derive(Clone)]
pub struct StatusReporter {
    publisher: Arc<dyn CommitStatusPublisher>,
    trace_base_url: String,
}

impl std::fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusReporter")
            .field("trace_base_url", &self.trace_base_url)
            .finish_non_exhaustive()
    }
}

impl StatusReporter {
    /// Creates a reporter linking statuses to `<trace_base_url>/<workspace_id>`.
    pub fn new(publisher: Arc<dyn CommitStatusPublisher>, trace_base_url: impl Into<String>) -> Self {
        Self {
            publisher,
            trace_base_url: trace_base_url.into(),
        }
    }

    /// Posts the commit status for one finished run to `descriptor.statuses_url`.
    ///
    /// # Errors
    ///
    /// Whatever the publisher returns; the caller logs it and moves on.
    pub async fn report(
        &self,
        descriptor: &EventDescriptor,
        script_name: &HookName,
        workspace_id: &WorkspaceId,
        result: &TaskResult,
    ) -> Result<(), ReportError> {
        let status = CommitStatus::for_result(
            script_name.as_str(),
            result,
            &self.trace_base_url,
            workspace_id,
        );
        let span = info_span!("commit_status", context = %status.context, state = %status.state);
        async {
            self.publisher
                .publish(&descriptor.statuses_url, &status)
                .await?;
            info!(target_url = %status.target_url, "commit status posted");
            Ok(())
        }
        .instrument(span)
        .await
    }
}
