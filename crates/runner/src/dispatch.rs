//! Single-flight execution of hook runs.
//!
//! Hook scripts usually check out and build a whole repository, so running
//! several at once can exhaust the host. Every run therefore goes through one
//! queue drained by exactly one worker: at most one hook subprocess exists at
//! any time, process-wide, whatever delivery or repository queued it. A slow
//! hook delays every hook queued behind it.
//!
//! Queuing never blocks, so the webhook handler can acknowledge immediately.
//! Commit statuses are posted from separate tasks so a slow host API does not
//! hold up the next run, and a failed report affects only itself.

use std::sync::Arc;

use pipeline::{EventDescriptor, HookScript};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::{StatusReporter, TaskExecutor};

/// One queued hook run.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    /// Shared by every request of the same delivery.
    pub descriptor: Arc<EventDescriptor>,
    /// The hook to run.
    pub script: HookScript,
}

/// Sending side of the execution queue. Cheap to clone.
///
/// The worker stops once every handle has been dropped and the queue is
/// drained.
#[derive(Debug, Clone)]
pub struct DispatchHandle {
    tx: mpsc::UnboundedSender<TaskRequest>,
}

impl DispatchHandle {
    /// Queues one run per script, in order. Returns how many were queued.
    pub fn dispatch(&self, descriptor: Arc<EventDescriptor>, scripts: Vec<HookScript>) -> usize {
        let mut queued = 0;
        for script in scripts {
            let name = script.name.clone();
            let request = TaskRequest {
                descriptor: Arc::clone(&descriptor),
                script,
            };
            if self.tx.send(request).is_err() {
                warn!(hook = %name, "execution queue closed, dropping hook");
                continue;
            }
            queued += 1;
        }
        queued
    }
}

/// The single worker draining the execution queue.
pub struct Dispatcher {
    executor: TaskExecutor,
    reporter: StatusReporter,
    rx: mpsc::UnboundedReceiver<TaskRequest>,
}

impl Dispatcher {
    /// Spawns the worker. The returned task completes once all handles are
    /// dropped, every queued run has finished, and every report has settled.
    pub fn start(executor: TaskExecutor, reporter: StatusReporter) -> (DispatchHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            executor,
            reporter,
            rx,
        };
        (DispatchHandle { tx }, tokio::spawn(dispatcher.run()))
    }

    async fn run(mut self) {
        let mut reports = JoinSet::new();

        while let Some(request) = self.rx.recv().await {
            self.execute(request, &mut reports).await;
            while let Some(done) = reports.try_join_next() {
                log_join(done);
            }
        }

        debug!(pending_reports = reports.len(), "execution queue closed");
        while let Some(done) = reports.join_next().await {
            log_join(done);
        }
        info!("dispatcher stopped");
    }

    async fn execute(&self, request: TaskRequest, reports: &mut JoinSet<()>) {
        let TaskRequest { descriptor, script } = request;

        let run = match self.executor.run(&descriptor, &script).await {
            Ok(run) => run,
            Err(e) => {
                error!(hook = %script.name, error = %e, "hook run aborted");
                return;
            }
        };

        let reporter = self.reporter.clone();
        reports.spawn(async move {
            if let Err(e) = reporter
                .report(&descriptor, &script.name, run.workspace.id(), &run.result)
                .await
            {
                error!(
                    hook = %script.name,
                    workspace = %run.workspace.id(),
                    error = %e,
                    "failed to report commit status"
                );
            }
        });
    }
}

fn log_join(done: Result<(), tokio::task::JoinError>) {
    if let Err(e) = done {
        error!(error = %e, "report task panicked");
    }
}
