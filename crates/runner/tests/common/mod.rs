//! Shared helpers for runner integration tests.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use pipeline::{
    CommitStatus, CommitStatusPublisher, DescriptorExtractor, EventDescriptor, EventKind,
    ReportError,
};

/// Writes an executable hook script.
pub fn write_hook(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn push_payload(owner: &str, repo: &str) -> serde_json::Value {
    serde_json::json!({
        "ref": "refs/heads/main",
        "head_commit": { "id": "0123abcd" },
        "repository": { "name": repo, "owner": { "name": owner } }
    })
}

pub fn push_descriptor(owner: &str, repo: &str) -> EventDescriptor {
    DescriptorExtractor::default()
        .extract_value(&EventKind::Push, &push_payload(owner, repo), "/tmp/payload.json")
        .unwrap()
}

pub fn pull_request_descriptor() -> EventDescriptor {
    let payload = serde_json::json!({
        "pull_request": {
            "number": 42,
            "statuses_url": "https://api.github.com/repos/org/proj/statuses/feedbeef",
            "head": {
                "ref": "topic",
                "sha": "feedbeef",
                "repo": { "name": "proj-fork", "owner": { "login": "alice" } }
            },
            "base": { "repo": { "name": "proj", "owner": { "login": "org" } } }
        }
    });
    DescriptorExtractor::default()
        .extract_value(&EventKind::PullRequest, &payload, "/tmp/payload.json")
        .unwrap()
}

/// Records every published status; optionally rejects the first N calls.
#[derive(Default)]
pub struct RecordingPublisher {
    calls: Mutex<Vec<(String, CommitStatus)>>,
    reject_first: usize,
}

impl RecordingPublisher {
    pub fn rejecting_first(n: usize) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            reject_first: n,
        }
    }

    pub fn calls(&self) -> Vec<(String, CommitStatus)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommitStatusPublisher for RecordingPublisher {
    async fn publish(&self, statuses_url: &str, status: &CommitStatus) -> Result<(), ReportError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((statuses_url.to_string(), status.clone()));
        if calls.len() <= self.reject_first {
            return Err(ReportError::UnexpectedStatus {
                status: 422,
                body: "rejected".to_string(),
            });
        }
        Ok(())
    }
}
