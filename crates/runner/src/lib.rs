//! hookci orchestration.
//!
//! Sequences the domain types from the [`pipeline`] crate into the CI flow:
//!
//! ```text
//! payload ─▶ CiEngine ─▶ HookResolver ─▶ DispatchHandle ═▶ Dispatcher (one worker)
//!                                                             │
//!                                         TaskExecutor ◀──────┤
//!                                         StatusReporter ◀────┘
//! ```
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** This crate spawns processes and touches the file
//! system, but talks to the source-control host only through
//! [`pipeline::CommitStatusPublisher`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`resolver`] | `HookResolver`: allow-list check and hook discovery |
//! | [`workspace`] | `Workspace`: per-run directories |
//! | [`executor`] | `TaskExecutor`: direct/shell execution under a watchdog |
//! | [`dispatch`] | `Dispatcher`: the single-worker execution queue |
//! | [`reporter`] | `StatusReporter`: task result → commit status |
//! | [`engine`] | `CiEngine`: delivery → queued runs |
//! | [`errors`] | `RunnerError` |

pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod reporter;
pub mod resolver;
pub mod workspace;

pub use dispatch::{DispatchHandle, Dispatcher, TaskRequest};
pub use engine::{CiEngine, DeliveryOutcome};
pub use errors::RunnerError;
pub use executor::{
    clone_url, shell_program, ExecutorConfig, TaskExecutor, TaskRun, DEFAULT_CLONE_BASE,
    DEFAULT_SCRIPT_TIMEOUT, DEFAULT_SHELL,
};
pub use reporter::StatusReporter;
pub use resolver::HookResolver;
pub use workspace::Workspace;
