//! Running one hook script to completion.
//!
//! [`TaskExecutor::run`] creates a [`Workspace`], registers it in the
//! [`TraceStore`], and runs the hook inside it:
//!
//! - **Direct** hooks are executed as programs with the descriptor fields as
//!   positional arguments and stdin closed.
//! - **Shell** hooks are piped into the configured shell after a generated
//!   checkout block, with the descriptor fields exposed as environment
//!   variables. The checkout leaves the pushed branch (or the pull request's
//!   pre-merge ref) in the working directory.
//!
//! A watchdog kills the hook's whole process group once the configured
//! timeout elapses. Whatever the hook printed up to that point is still used
//! for the status text.
//!
//! The executor itself does not serialise runs; [`crate::Dispatcher`] calls it
//! from a single worker.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pipeline::{
    status_text_from_output, EventDescriptor, EventKind, ExecutionMode, HookScript, TaskResult,
    Timestamp, TraceStore,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{RunnerError, Workspace};

/// Default hook timeout: ten minutes.
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(600);

/// Default interpreter for shell-mode hooks.
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Default base URL repositories are fetched from in shell mode.
pub const DEFAULT_CLONE_BASE: &str = "https://github.com";

/// How long to keep draining stdout after the watchdog killed the hook.
const KILLED_OUTPUT_GRACE: Duration = Duration::from_secs(1);

/// Only the end of a hook's stdout is kept; the status comes from its last lines.
pub const OUTPUT_TAIL_LIMIT: usize = 64 * 1024;

/// Variables hooks inherit from the server's environment. Everything else,
/// credentials included, is withheld.
pub const INHERITED_ENV: &[&str] = &["PATH", "HOME", "USER", "LANG", "LC_ALL", "TZ", "TMPDIR"];

/// Exit code recorded when the hook could not be started or waited on.
const SPAWN_FAILURE_EXIT_CODE: i32 = -1;

const PUSH_CHECKOUT: &str = r#"git init -q
git remote add hookci "$clone_url"
git fetch hookci "$branch:hookci"
git checkout -q hookci
"#;

// The host computes refs/pull/N/merge asynchronously after the event fires.
const PULL_REQUEST_CHECKOUT: &str = r#"git init -q
git remote add hookci "$clone_url"
sleep 2
git fetch hookci "+refs/pull/$pr_number/merge:hookci"
git checkout -q hookci
"#;

const CLEANUP: &str = r#"hookci_status=$?
rm -rf .git
exit $hookci_status
"#;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Settings shared by every hook run.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Watchdog deadline per run.
    pub timeout: Duration,
    /// Interpreter for shell-mode hooks.
    pub shell: PathBuf,
    /// Directory workspaces are created under.
    pub workspace_root: PathBuf,
    /// Base URL the checkout block fetches `<owner>/<repo>.git` from.
    pub clone_base: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SCRIPT_TIMEOUT,
            shell: PathBuf::from(DEFAULT_SHELL),
            workspace_root: std::env::temp_dir(),
            clone_base: DEFAULT_CLONE_BASE.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// A finished run: where it ran and how it went.
#[derive(Debug, Clone)]
pub struct TaskRun {
    /// The run's workspace, already registered in the trace store.
    pub workspace: Workspace,
    /// Exit code and status text.
    pub result: TaskResult,
}

/// Runs hook scripts inside fresh workspaces under a watchdog.
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    config: ExecutorConfig,
    traces: TraceStore,
}

impl TaskExecutor {
    /// Creates an executor registering its workspaces in `traces`.
    pub fn new(config: ExecutorConfig, traces: TraceStore) -> Self {
        Self { config, traces }
    }

    /// Runs `script` for `descriptor`.
    ///
    /// A hook that fails, times out, or cannot be started still yields a
    /// [`TaskRun`] with a failing exit code.
    ///
    /// # Errors
    ///
    /// [`RunnerError::Workspace`] if the workspace cannot be created; the hook
    /// is not run in that case.
    pub async fn run(
        &self,
        descriptor: &EventDescriptor,
        script: &HookScript,
    ) -> Result<TaskRun, RunnerError> {
        let workspace = Workspace::create(&self.config.workspace_root).await?;
        self.traces
            .register(workspace.id().clone(), workspace.path().to_path_buf());

        let span = info_span!("hook_task", hook = %script.name, workspace = %workspace.id());
        let result = self
            .execute(descriptor, script, &workspace)
            .instrument(span)
            .await;

        Ok(TaskRun { workspace, result })
    }

    async fn execute(
        &self,
        descriptor: &EventDescriptor,
        script: &HookScript,
        workspace: &Workspace,
    ) -> TaskResult {
        let started_at = Timestamp::now();
        info!(mode = ?script.mode, "starting hook");

        let spawned = match script.mode {
            ExecutionMode::Direct => self.spawn_direct(descriptor, script, workspace),
            ExecutionMode::Shell => self.spawn_shell(descriptor, script, workspace).await,
        };
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!(error = %e, "hook could not be started");
                return TaskResult {
                    status_text: format!("failed to start hook: {e}"),
                    exit_code: SPAWN_FAILURE_EXIT_CODE,
                    timed_out: false,
                    started_at,
                    finished_at: Timestamp::now(),
                };
            }
        };

        // The group id is the hook's pid; it is gone from `child` once reaped.
        let group = child.id();
        let deadline = Instant::now() + self.config.timeout;
        let output = Arc::new(Mutex::new(Vec::new()));
        let mut reader = tokio::spawn(collect_output(child.stdout.take(), Arc::clone(&output)));

        let waited = tokio::time::timeout_at(deadline, child.wait()).await;
        let (exit_code, mut timed_out) = match waited {
            Ok(Ok(status)) => (exit_code_of(status), false),
            Ok(Err(e)) => {
                warn!(error = %e, "failed to wait for hook");
                (SPAWN_FAILURE_EXIT_CODE, false)
            }
            Err(_) => {
                warn!(timeout_secs = self.config.timeout.as_secs(), "hook timed out, killing");
                (kill(&mut child, group).await, true)
            }
        };

        // Background processes holding stdout belong to this run until the deadline.
        let drain_until = deadline.max(Instant::now() + KILLED_OUTPUT_GRACE);
        if tokio::time::timeout_at(drain_until, &mut reader).await.is_err() {
            warn!("hook output still open at the deadline, killing its process group");
            reader.abort();
            timed_out = true;
        }
        // Nothing the hook started may outlive the run.
        kill_group(group);
        let finished_at = Timestamp::now();

        let stdout = {
            let bytes = output.lock().unwrap_or_else(|e| e.into_inner());
            String::from_utf8_lossy(&bytes).into_owned()
        };
        let status_text = match workspace.status_override().await {
            Some(text) => text,
            None => status_text_from_output(&stdout),
        };

        info!(exit_code, timed_out, status = %status_text, "hook finished");
        TaskResult {
            status_text,
            exit_code,
            timed_out,
            started_at,
            finished_at,
        }
    }

    fn spawn_direct(
        &self,
        descriptor: &EventDescriptor,
        script: &HookScript,
        workspace: &Workspace,
    ) -> std::io::Result<Child> {
        // The hook runs with the workspace as cwd, so a relative path would break.
        let program = std::path::absolute(script.path())?;
        let mut command = Command::new(program);
        configure(&mut command, workspace);
        command
            .args(descriptor.arguments())
            .stdin(Stdio::null());
        command.spawn()
    }

    async fn spawn_shell(
        &self,
        descriptor: &EventDescriptor,
        script: &HookScript,
        workspace: &Workspace,
    ) -> std::io::Result<Child> {
        let body = tokio::fs::read_to_string(script.path()).await?;
        let program = shell_program(&descriptor.kind, &body);

        let mut command = Command::new(&self.config.shell);
        configure(&mut command, workspace);
        command
            .envs(descriptor.variables())
            .env("clone_url", clone_url(&self.config.clone_base, descriptor))
            .stdin(Stdio::piped());
        let mut child = command.spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // Written from a separate task so a hook that never reads stdin to
            // the end cannot stall the watchdog.
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(program.as_bytes()).await {
                    debug!(error = %e, "shell closed stdin early");
                }
                let _ = stdin.shutdown().await;
            });
        }
        Ok(child)
    }
}

/// Settings common to both execution modes. Must run before any
/// mode-specific variables are set, since it clears the environment.
fn configure(command: &mut Command, workspace: &Workspace) {
    command.env_clear();
    for key in INHERITED_ENV {
        if let Some(value) = std::env::var_os(key) {
            command.env(key, value);
        }
    }
    command
        .current_dir(workspace.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    // Own process group, so the watchdog can take down everything the hook spawned.
    #[cfg(unix)]
    command.process_group(0);
}

/// Text fed to the shell for a shell-mode hook: checkout, hook body, cleanup.
///
/// Contains no descriptor values; those arrive through the environment.
pub fn shell_program(kind: &EventKind, hook_body: &str) -> String {
    let checkout = match kind {
        EventKind::Push => PUSH_CHECKOUT,
        EventKind::PullRequest => PULL_REQUEST_CHECKOUT,
        EventKind::Other(_) => "",
    };
    format!("{checkout}\n{hook_body}\n{CLEANUP}")
}

/// Remote the checkout block fetches from: the repository receiving the status.
pub fn clone_url(clone_base: &str, descriptor: &EventDescriptor) -> String {
    let (owner, repo) = descriptor
        .build_target()
        .unwrap_or((descriptor.owner.as_str(), descriptor.repo.as_str()));
    format!("{}/{}/{}.git", clone_base.trim_end_matches('/'), owner, repo)
}

async fn collect_output(stdout: Option<ChildStdout>, sink: Arc<Mutex<Vec<u8>>>) {
    let Some(mut stdout) = stdout else {
        return;
    };
    let mut chunk = [0u8; 8192];
    loop {
        match stdout.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let mut tail = sink.lock().unwrap_or_else(|e| e.into_inner());
                append_tail(&mut tail, &chunk[..n], OUTPUT_TAIL_LIMIT);
            }
        }
    }
}

/// Appends `chunk`, then drops bytes from the front beyond `limit`.
fn append_tail(tail: &mut Vec<u8>, chunk: &[u8], limit: usize) {
    tail.extend_from_slice(chunk);
    if tail.len() > limit {
        let excess = tail.len() - limit;
        tail.drain(..excess);
    }
}

/// Sends `SIGKILL` to every process left in the hook's group.
///
/// An empty group is the normal case and is not an error.
fn kill_group(group: Option<u32>) {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let Some(pid) = group else {
            return;
        };
        match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            Ok(()) => debug!(pid, "killed leftover hook processes"),
            Err(Errno::ESRCH) => {}
            Err(e) => debug!(pid, error = %e, "failed to signal process group"),
        }
    }
    #[cfg(not(unix))]
    let _ = group;
}

/// Kills the hook's process group and reaps the hook.
///
/// Tokio refuses to signal a child it has already reaped, so a hook that
/// exits just as the deadline fires is never signalled after the fact.
async fn kill(child: &mut Child, group: Option<u32>) -> i32 {
    kill_group(group);
    if let Err(e) = child.kill().await {
        debug!(error = %e, "hook already reaped");
    }
    match child.wait().await {
        Ok(status) => exit_code_of(status),
        Err(e) => {
            warn!(error = %e, "failed to reap killed hook");
            SPAWN_FAILURE_EXIT_CODE
        }
    }
}

/// Exit code, or `-<signal>` for signal-terminated processes.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    SPAWN_FAILURE_EXIT_CODE
}
