//! Descriptor extraction against recorded GitHub payloads.

use pipeline::{DescriptorExtractor, EventKind, PipelineError, UNKNOWN};

const PUSH_EVENT: &[u8] = include_bytes!("fixtures/push_event.json");
const PULL_REQUEST_EVENT: &[u8] = include_bytes!("fixtures/pull_request_event.json");

#[test]
fn push_event_fields() {
    let d = DescriptorExtractor::default()
        .extract(&EventKind::Push, PUSH_EVENT, "/tmp/push.json")
        .unwrap();

    assert_eq!(d.owner, "monperrus");
    assert_eq!(d.repo, "test");
    assert_eq!(d.branch, "master");
    assert_eq!(d.commit, "385f1274627568a6d225061452abb3f3663ff57d");
    assert_eq!(
        d.statuses_url,
        "https://api.github.com/repos/monperrus/test/statuses/385f1274627568a6d225061452abb3f3663ff57d"
    );
    assert_eq!(d.build_repository().unwrap().to_string(), "monperrus/test");
}

#[test]
fn push_extraction_is_deterministic() {
    let extractor = DescriptorExtractor::default();
    let first = extractor
        .extract(&EventKind::Push, PUSH_EVENT, "/tmp/push.json")
        .unwrap();
    for _ in 0..5 {
        let again = extractor
            .extract(&EventKind::Push, PUSH_EVENT, "/tmp/push.json")
            .unwrap();
        assert_eq!(first, again);
    }
}

#[test]
fn push_without_head_commit_is_unknown() {
    let mut payload: serde_json::Value = serde_json::from_slice(PUSH_EVENT).unwrap();
    payload.as_object_mut().unwrap().remove("head_commit");
    payload.as_object_mut().unwrap().remove("ref");

    let d = DescriptorExtractor::default()
        .extract_value(&EventKind::Push, &payload, "/tmp/push.json")
        .unwrap();
    assert_eq!(d.commit, UNKNOWN);
    assert_eq!(d.branch, UNKNOWN);
    assert_eq!(
        d.statuses_url,
        "https://api.github.com/repos/monperrus/test/statuses/unknown"
    );
}

#[test]
fn pull_request_event_fields() {
    let d = DescriptorExtractor::default()
        .extract(&EventKind::PullRequest, PULL_REQUEST_EVENT, "/tmp/pr.json")
        .unwrap();

    assert_eq!(d.owner, "pvojtechovsky");
    assert_eq!(d.repo, "spoon");
    assert_eq!(d.branch, "supportCommentsInSnippet");
    assert_eq!(d.commit, "e640b870f24eb7fc1078d36a4657b556874119e5");
    assert_eq!(
        d.statuses_url,
        "https://api.github.com/repos/INRIA/spoon/statuses/e640b870f24eb7fc1078d36a4657b556874119e5"
    );

    let pr = d.pull_request.as_ref().unwrap();
    assert_eq!(pr.base_owner, "INRIA");
    assert_eq!(pr.base_repo, "spoon");
    assert_eq!(pr.pr_number, "930");

    // Statuses go to the repository that receives the merge.
    assert_eq!(d.build_repository().unwrap().to_string(), "INRIA/spoon");
}

#[test]
fn pull_request_statuses_url_is_taken_verbatim() {
    let mut payload: serde_json::Value = serde_json::from_slice(PULL_REQUEST_EVENT).unwrap();
    payload["pull_request"]["statuses_url"] = "https://ghe.example/custom/statuses/x".into();
    let d = DescriptorExtractor::new("https://api.github.com")
        .extract_value(&EventKind::PullRequest, &payload, "/tmp/pr.json")
        .unwrap();
    assert_eq!(d.statuses_url, "https://ghe.example/custom/statuses/x");
}

#[test]
fn pull_request_arguments_have_nine_entries() {
    let d = DescriptorExtractor::default()
        .extract(&EventKind::PullRequest, PULL_REQUEST_EVENT, "/tmp/pr.json")
        .unwrap();
    assert_eq!(
        d.arguments(),
        vec![
            "/tmp/pr.json",
            "pull_request",
            "pvojtechovsky",
            "spoon",
            "supportCommentsInSnippet",
            "e640b870f24eb7fc1078d36a4657b556874119e5",
            "INRIA",
            "spoon",
            "930",
        ]
    );
}

#[test]
fn pull_request_missing_leaves_default_to_unknown() {
    let payload = serde_json::json!({ "pull_request": { "head": {} } });
    let d = DescriptorExtractor::default()
        .extract_value(&EventKind::PullRequest, &payload, "/tmp/pr.json")
        .unwrap();
    assert_eq!(d.owner, UNKNOWN);
    assert_eq!(d.commit, UNKNOWN);
    assert_eq!(d.statuses_url, UNKNOWN);
    assert_eq!(d.pull_request.unwrap().pr_number, UNKNOWN);
}

#[test]
fn pull_request_without_pull_request_object_is_malformed() {
    let err = DescriptorExtractor::default()
        .extract(&EventKind::PullRequest, PUSH_EVENT, "/tmp/pr.json")
        .unwrap_err();
    assert!(matches!(err, PipelineError::MalformedPayload { .. }));
}
