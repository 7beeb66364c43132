//! Hook execution: arguments, status text, workspaces, and the watchdog.

mod common;

use std::time::{Duration, Instant};

use common::{pull_request_descriptor, push_descriptor, write_hook};
use pipeline::{HookScript, TraceStore, NO_OUTPUT};
use runner::{ExecutorConfig, TaskExecutor};
use tempfile::TempDir;

struct Fixture {
    hooks: TempDir,
    workspaces: TempDir,
    traces: TraceStore,
}

impl Fixture {
    fn new() -> Self {
        Self {
            hooks: TempDir::new().unwrap(),
            workspaces: TempDir::new().unwrap(),
            traces: TraceStore::new(),
        }
    }

    fn executor(&self) -> TaskExecutor {
        self.executor_with_timeout(Duration::from_secs(30))
    }

    fn executor_with_timeout(&self, timeout: Duration) -> TaskExecutor {
        let config = ExecutorConfig {
            timeout,
            workspace_root: self.workspaces.path().to_path_buf(),
            clone_base: self.hooks.path().join("no-such-remote").display().to_string(),
            ..ExecutorConfig::default()
        };
        TaskExecutor::new(config, self.traces.clone())
    }

    fn hook(&self, name: &str, body: &str) -> HookScript {
        HookScript::from_path(write_hook(self.hooks.path(), name, body)).unwrap()
    }
}

#[tokio::test]
async fn direct_hook_receives_push_arguments() {
    let fx = Fixture::new();
    let hook = fx.hook("push-A-B", "#!/bin/sh\necho \"$#|$1|$2|$3|$4|$5|$6\"\n");

    let run = fx.executor().run(&push_descriptor("A", "B"), &hook).await.unwrap();

    assert_eq!(run.result.exit_code, 0);
    assert_eq!(
        run.result.status_text,
        "6|/tmp/payload.json|push|A|B|main|0123abcd"
    );
}

#[tokio::test]
async fn direct_hook_receives_pull_request_arguments() {
    let fx = Fixture::new();
    let hook = fx.hook("pull_request-org-proj", "#!/bin/sh\necho \"$#|$7|$8|$9\"\n");

    let run = fx
        .executor()
        .run(&pull_request_descriptor(), &hook)
        .await
        .unwrap();

    assert_eq!(run.result.status_text, "9|org|proj|42");
}

#[tokio::test]
async fn direct_hook_runs_in_workspace_with_closed_stdin() {
    let fx = Fixture::new();
    let hook = fx.hook(
        "push-A-B",
        "#!/bin/sh\npwd > where.txt\nif read line; then echo got-input; else echo no-input; fi\n",
    );

    let run = fx.executor().run(&push_descriptor("A", "B"), &hook).await.unwrap();

    assert_eq!(run.result.status_text, "no-input");
    let recorded = std::fs::read_to_string(run.workspace.path().join("where.txt")).unwrap();
    assert_eq!(
        std::fs::canonicalize(recorded.trim()).unwrap(),
        std::fs::canonicalize(run.workspace.path()).unwrap()
    );
}

#[tokio::test]
async fn status_text_is_last_non_empty_line() {
    let fx = Fixture::new();
    let hook = fx.hook("push-A-B", "#!/bin/sh\necho building\necho\necho OK\n");

    let run = fx.executor().run(&push_descriptor("A", "B"), &hook).await.unwrap();
    assert_eq!(run.result.status_text, "OK");
}

#[tokio::test]
async fn silent_hook_reports_placeholder() {
    let fx = Fixture::new();
    let hook = fx.hook("push-A-B", "#!/bin/sh\necho oops >&2\nexit 0\n");

    let run = fx.executor().run(&push_descriptor("A", "B"), &hook).await.unwrap();
    assert_eq!(run.result.status_text, NO_OUTPUT);
    assert!(run.result.succeeded());
}

#[tokio::test]
async fn status_file_overrides_stdout() {
    let fx = Fixture::new();
    let hook = fx.hook(
        "push-A-B",
        "#!/bin/sh\necho custom-status > status.txt\necho something else\nexit 1\n",
    );

    let run = fx.executor().run(&push_descriptor("A", "B"), &hook).await.unwrap();
    assert_eq!(run.result.status_text, "custom-status");
    assert_eq!(run.result.exit_code, 1);
    assert!(!run.result.succeeded());
}

#[tokio::test]
async fn workspace_is_registered_and_keeps_trace() {
    let fx = Fixture::new();
    let hook = fx.hook("push-A-B", "#!/bin/sh\necho yeah | tee trace.txt\n");

    let run = fx.executor().run(&push_descriptor("A", "B"), &hook).await.unwrap();

    let registered = fx.traces.lookup(run.workspace.id()).unwrap();
    assert_eq!(registered, run.workspace.path());
    assert_eq!(
        std::fs::read_to_string(fx.traces.trace_path(run.workspace.id()).unwrap()).unwrap(),
        "yeah\n"
    );
    assert_eq!(run.result.status_text, "yeah");
}

#[tokio::test]
async fn each_run_gets_its_own_workspace() {
    let fx = Fixture::new();
    let hook = fx.hook("push-A-B", "#!/bin/sh\necho hi\n");
    let executor = fx.executor();

    let a = executor.run(&push_descriptor("A", "B"), &hook).await.unwrap();
    let b = executor.run(&push_descriptor("A", "B"), &hook).await.unwrap();
    assert_ne!(a.workspace.id(), b.workspace.id());
    assert_eq!(fx.traces.len(), 2);
}

#[tokio::test]
async fn watchdog_kills_slow_hook_and_keeps_partial_output() {
    let fx = Fixture::new();
    let hook = fx.hook("push-A-B", "#!/bin/sh\necho started\nsleep 30\necho finished\n");

    let started = Instant::now();
    let run = fx
        .executor_with_timeout(Duration::from_millis(300))
        .run(&push_descriptor("A", "B"), &hook)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(run.result.timed_out);
    assert_eq!(run.result.exit_code, -9);
    assert_eq!(run.result.status_text, "started");
    assert!(fx.traces.lookup(run.workspace.id()).is_some());
    assert!(run.workspace.path().is_dir());
}

#[tokio::test]
async fn silent_slow_hook_times_out_with_placeholder() {
    let fx = Fixture::new();
    let hook = fx.hook("push-A-B", "#!/bin/sh\nsleep 30\n");

    let run = fx
        .executor_with_timeout(Duration::from_millis(200))
        .run(&push_descriptor("A", "B"), &hook)
        .await
        .unwrap();

    assert!(run.result.timed_out);
    assert!(!run.result.succeeded());
    assert_eq!(run.result.status_text, NO_OUTPUT);
}

#[tokio::test]
async fn removed_hook_is_a_failed_run() {
    let fx = Fixture::new();
    let hook = fx.hook("push-A-B", "#!/bin/sh\necho hi\n");
    std::fs::remove_file(&hook.path).unwrap();

    let run = fx.executor().run(&push_descriptor("A", "B"), &hook).await.unwrap();
    assert_eq!(run.result.exit_code, -1);
    assert!(run.result.status_text.starts_with("failed to start hook"));
}

#[tokio::test]
async fn shell_hook_sees_descriptor_variables() {
    let fx = Fixture::new();
    let hook = fx.hook(
        "push-A-B-vars.sh",
        "echo \"$event_type $owner/$repo@$branch $TRAVIS_REPO_SLUG\"\n",
    );

    let run = fx.executor().run(&push_descriptor("A", "B"), &hook).await.unwrap();
    assert_eq!(run.result.status_text, "push A/B@main A/B");
    assert_eq!(run.result.exit_code, 0);
}

#[tokio::test]
async fn shell_hook_values_are_not_evaluated() {
    let fx = Fixture::new();
    let hook = fx.hook("push-A-B-quote.sh", "echo \"$repo\"\n");

    let run = fx
        .executor()
        .run(&push_descriptor("A", "B\"; echo injected; \""), &hook)
        .await
        .unwrap();
    assert_eq!(run.result.status_text, "B\"; echo injected; \"");
}

#[tokio::test]
async fn shell_hook_exit_status_survives_cleanup() {
    let fx = Fixture::new();
    let hook = fx.hook("push-A-B-fail.sh", "echo checking\nfalse\n");

    let run = fx.executor().run(&push_descriptor("A", "B"), &hook).await.unwrap();
    assert_eq!(run.result.exit_code, 1);
    assert_eq!(run.result.status_text, "checking");
    assert!(!run.workspace.path().join(".git").exists());
}

#[tokio::test]
async fn shell_hook_pull_request_variables() {
    let fx = Fixture::new();
    let hook = fx.hook(
        "pull_request-org-proj.sh",
        "echo \"$pr_number $base_owner/$base_repo $build_owner/$build_repo\"\n",
    );

    let run = fx
        .executor()
        .run(&pull_request_descriptor(), &hook)
        .await
        .unwrap();
    assert_eq!(run.result.status_text, "42 org/proj org/proj");
}

#[tokio::test]
async fn blank_status_file_falls_back_to_stdout() {
    let fx = Fixture::new();
    let hook = fx.hook("push-A-B", "#!/bin/sh\necho > status.txt\necho from stdout\n");

    let run = fx.executor().run(&push_descriptor("A", "B"), &hook).await.unwrap();
    assert_eq!(run.result.status_text, "from stdout");
}

#[tokio::test]
async fn detached_background_process_does_not_outlive_run() {
    let fx = Fixture::new();
    let marker = fx.workspaces.path().join("late-marker");
    let hook = fx.hook(
        "push-A-B",
        &format!(
            "#!/bin/sh\n(sleep 1; touch \"{}\") >/dev/null 2>&1 &\necho done\n",
            marker.display()
        ),
    );

    let run = fx.executor().run(&push_descriptor("A", "B"), &hook).await.unwrap();
    assert_eq!(run.result.status_text, "done");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!marker.exists());
}

#[tokio::test]
async fn background_process_holding_output_extends_the_run() {
    let fx = Fixture::new();
    let hook = fx.hook("push-A-B", "#!/bin/sh\n(sleep 1; echo late) &\necho early\n");

    let run = fx.executor().run(&push_descriptor("A", "B"), &hook).await.unwrap();
    assert_eq!(run.result.status_text, "late");
    assert!(!run.result.timed_out);
}

#[tokio::test]
async fn background_process_is_killed_at_the_deadline() {
    let fx = Fixture::new();
    let hook = fx.hook("push-A-B", "#!/bin/sh\n(sleep 30; echo never) &\necho early\n");

    let started = Instant::now();
    let run = fx
        .executor_with_timeout(Duration::from_millis(500))
        .run(&push_descriptor("A", "B"), &hook)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(run.result.timed_out);
    assert_eq!(run.result.exit_code, 0);
    assert_eq!(run.result.status_text, "early");
}
