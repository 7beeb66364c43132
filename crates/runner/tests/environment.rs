//! Hooks only see an allow-listed slice of the server's environment.
//!
//! Kept in its own test binary because it mutates the process environment.

mod common;

use std::time::Duration;

use common::{pull_request_descriptor, push_descriptor, write_hook};
use pipeline::{HookScript, TraceStore};
use runner::{ExecutorConfig, TaskExecutor};
use tempfile::TempDir;

#[tokio::test]
async fn server_credentials_are_withheld_from_hooks() {
    std::env::set_var("GITHUB_TOKEN", "ghp_server_secret");
    std::env::set_var("HOOKCI_TEST_SECRET", "hunter2");

    let hooks = TempDir::new().unwrap();
    let workspaces = TempDir::new().unwrap();
    let config = ExecutorConfig {
        timeout: Duration::from_secs(30),
        workspace_root: workspaces.path().to_path_buf(),
        clone_base: hooks.path().join("no-such-remote").display().to_string(),
        ..ExecutorConfig::default()
    };
    let executor = TaskExecutor::new(config, TraceStore::new());
    let report_env = "echo \"token=${GITHUB_TOKEN:-}|other=${HOOKCI_TEST_SECRET:-}|path=${PATH:+set}\"\n";

    let direct = HookScript::from_path(write_hook(
        hooks.path(),
        "pull_request-org-proj",
        &format!("#!/bin/sh\n{report_env}"),
    ))
    .unwrap();
    let run = executor.run(&pull_request_descriptor(), &direct).await.unwrap();
    assert_eq!(run.result.status_text, "token=|other=|path=set");

    let shell =
        HookScript::from_path(write_hook(hooks.path(), "push-A-B-env.sh", report_env)).unwrap();
    let run = executor.run(&push_descriptor("A", "B"), &shell).await.unwrap();
    assert_eq!(run.result.status_text, "token=|other=|path=set");
}
