//! Core domain for hookci.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, and error type used throughout the CI trigger. Infrastructure crates
//! implement the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate performs no network or
//! process I/O. It defines *what* is needed; infrastructure crates define
//! *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`WorkspaceId`, `HookName`, `RepositorySlug`, ...) |
//! | [`event`] | `EventKind`, `EventDescriptor`, and payload extraction |
//! | [`hook`] | `HookScript` and its execution mode |
//! | [`types`] | `TaskResult`, status-text extraction, `CommitStatus`, `Timestamp` |
//! | [`trace`] | `TraceStore` registry of workspaces |
//! | [`delivery`] | `DeliveryLog` bookkeeping of received deliveries |
//! | [`ports`] | `CommitStatusPublisher` |
//! | [`errors`] | `PipelineError`, `ReportError` |

pub mod delivery;
pub mod errors;
pub mod event;
pub mod hook;
pub mod identifiers;
pub mod ports;
pub mod trace;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use delivery::{DeliveryLog, DeliveryRecord};
pub use errors::{PipelineError, ReportError};
pub use event::{
    DescriptorExtractor, EventDescriptor, EventKind, PullRequestRefs, DEFAULT_API_BASE, UNKNOWN,
};
pub use hook::{hook_prefix, ExecutionMode, HookScript, SHELL_SUFFIX};
pub use identifiers::{DeliveryId, HookName, RepositorySlug, WorkspaceId};
pub use ports::CommitStatusPublisher;
pub use trace::{TraceStore, STATUS_FILE_NAME, TRACE_FILE_NAME};
pub use types::{
    status_text_from_output, CommitState, CommitStatus, TaskResult, Timestamp, NO_OUTPUT,
};
