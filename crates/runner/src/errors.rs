//! Errors raised while turning deliveries into hook runs.
//!
//! A hook that exits non-zero, times out, or cannot be started is *not* an
//! error here: it is a [`pipeline::TaskResult`] with a failing exit code and
//! is reported like any other outcome.

use std::path::PathBuf;

use pipeline::PipelineError;
use thiserror::Error;

/// Errors produced by the `runner` crate.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The delivery could not be turned into a descriptor.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A workspace directory could not be created. No status is reported for
    /// the affected run since there is no trace to link to.
    #[error("Cannot create workspace under {root}: {source}")]
    Workspace {
        /// Configured workspace root.
        root: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The raw payload could not be written to disk.
    #[error("Cannot store payload in {dir}: {source}")]
    PayloadStore {
        /// Directory the payload was written to.
        dir: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
