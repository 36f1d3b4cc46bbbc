#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use litepipe::api::{MAX_PAYLOAD_BYTES, router};
use litepipe::run::{Run, RunStatus, TaskStatus};
use litepipe::signature::{SignatureAlgorithm, sign};
use litepipe::{AppState, LitePipeConfig, SharedState};
use tempfile::TempDir;
use tokio::sync::broadcast;
use tower::ServiceExt;

const SECRET: &str = "test-secret";

fn test_config(dir: &Path, trigger_paths: &[&str], tasks: &[&str]) -> LitePipeConfig {
    let config = serde_json::json!({
        "webhookSecret": SECRET,
        "triggerPaths": trigger_paths,
        "tasks": tasks,
        "tasksWorkingDirectory": dir,
    });
    serde_json::from_value::<LitePipeConfig>(config)
        .unwrap()
        .validate()
        .unwrap()
}

fn test_app(config: LitePipeConfig) -> (Router, SharedState) {
    let state = Arc::new(AppState::new(config));
    (router(state.clone()), state)
}

fn push_body(added: &[&str], modified: &[&str], removed: &[&str]) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "ref": "refs/heads/main",
        "head_commit": {
            "id": "7fd1a60b01f91b314f59955a4e4d4e80d8edf11d",
            "message": "Update docs",
            "timestamp": "2024-05-01T12:00:00+02:00",
            "author": { "name": "Monalisa Octocat", "email": "mona@example.com" },
            "added": added,
            "modified": modified,
            "removed": removed
        }
    }))
    .unwrap()
}

fn webhook_request(body: Vec<u8>, header: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .header(header, signature)
        .body(Body::from(body))
        .unwrap()
}

fn signed_request(body: Vec<u8>, algorithm: SignatureAlgorithm) -> Request<Body> {
    let signature = sign(SECRET, &body, algorithm);
    webhook_request(body, algorithm.header_name(), &signature)
}

async fn next_run(events: &mut broadcast::Receiver<Run>) -> Run {
    tokio::time::timeout(Duration::from_secs(10), events.recv())
        .await
        .expect("run did not finish in time")
        .unwrap()
}

#[tokio::test]
async fn triggering_push_runs_tasks_once_in_order() {
    let dir = TempDir::new().unwrap();
    let config = test_config(
        dir.path(),
        &["docs/*"],
        &["echo first >> ran.txt", "echo second >> ran.txt"],
    );
    let (app, state) = test_app(config);
    let mut events = state.run_events.subscribe();

    let request = signed_request(push_body(&[], &["docs/readme.md"], &[]), SignatureAlgorithm::Sha256);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let run = next_run(&mut events).await;
    assert_eq!(run.status, RunStatus::Success);
    assert_eq!(run.matched_paths, vec!["docs/readme.md"]);
    assert_eq!(run.commit_id, "7fd1a60b01f91b314f59955a4e4d4e80d8edf11d");
    assert_eq!(run.results.len(), 2);
    assert_eq!(
        fs::read_to_string(dir.path().join("ran.txt")).unwrap(),
        "first\nsecond\n"
    );
}

#[tokio::test]
async fn legacy_sha1_signature_is_accepted() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &[], &["touch ran.txt"]);
    let (app, state) = test_app(config);
    let mut events = state.run_events.subscribe();

    let request = signed_request(push_body(&["src/deep/file.rs"], &[], &[]), SignatureAlgorithm::Sha1);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let run = next_run(&mut events).await;
    assert_eq!(run.status, RunStatus::Success);
    assert!(dir.path().join("ran.txt").exists());
}

#[tokio::test]
async fn invalid_signature_returns_403_and_runs_nothing() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["*"], &["touch ran.txt"]);
    let (app, state) = test_app(config);
    let mut events = state.run_events.subscribe();

    let body = push_body(&["README.md"], &[], &[]);
    let signature = sign("wrong-secret", &body, SignatureAlgorithm::Sha256);
    let request = webhook_request(body, "X-Hub-Signature-256", &signature);

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(matches!(
        events.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
    assert!(!dir.path().join("ran.txt").exists());
}

#[tokio::test]
async fn missing_signature_returns_403() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = test_app(test_config(dir.path(), &[], &["true"]));

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .body(Body::from(push_body(&["a"], &[], &[])))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn bad_sha256_header_does_not_fall_back_to_sha1() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = test_app(test_config(dir.path(), &[], &["true"]));

    let body = push_body(&["a"], &[], &[]);
    let valid_sha1 = sign(SECRET, &body, SignatureAlgorithm::Sha1);
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("X-Hub-Signature-256", "sha256=00")
        .header("X-Hub-Signature", valid_sha1)
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn non_matching_push_returns_200_and_runs_nothing() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["docs/*"], &["touch ran.txt"]);
    let (app, state) = test_app(config);
    let mut events = state.run_events.subscribe();

    let request = signed_request(push_body(&["lib/x.go"], &[], &[]), SignatureAlgorithm::Sha256);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let run = next_run(&mut events).await;
    assert_eq!(run.status, RunStatus::Skipped);
    assert!(run.results.is_empty());
    assert!(!dir.path().join("ran.txt").exists());
}

#[tokio::test]
async fn malformed_payload_returns_500() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = test_app(test_config(dir.path(), &[], &["true"]));

    let response = app
        .clone()
        .oneshot(signed_request(b"{ not json".to_vec(), SignatureAlgorithm::Sha256))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = app
        .oneshot(signed_request(br#"{"zen": "hi"}"#.to_vec(), SignatureAlgorithm::Sha256))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn authenticated_ping_is_acknowledged_without_a_run() {
    let dir = TempDir::new().unwrap();
    let (app, state) = test_app(test_config(dir.path(), &[], &["touch ran.txt"]));
    let mut events = state.run_events.subscribe();

    let body = br#"{"zen": "Design for failure.", "hook_id": 1}"#.to_vec();
    let signature = sign(SECRET, &body, SignatureAlgorithm::Sha256);
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("X-GitHub-Event", "ping")
        .header("X-Hub-Signature-256", signature)
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn failing_task_does_not_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &[], &["exit 0", "exit 1", "echo hi > third.txt"]);
    let (app, state) = test_app(config);
    let mut events = state.run_events.subscribe();

    let request = signed_request(push_body(&["a.txt"], &[], &[]), SignatureAlgorithm::Sha256);
    assert_eq!(app.oneshot(request).await.unwrap().status(), StatusCode::OK);

    let run = next_run(&mut events).await;
    assert_eq!(run.status, RunStatus::Failed);
    let statuses: Vec<_> = run.results.iter().map(|r| r.status.clone()).collect();
    assert_eq!(
        statuses,
        vec![TaskStatus::Success, TaskStatus::Failed, TaskStatus::Success]
    );
    assert_eq!(fs::read_to_string(dir.path().join("third.txt")).unwrap(), "hi\n");
}

#[tokio::test]
async fn other_methods_are_rejected() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = test_app(test_config(dir.path(), &[], &["true"]));

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn oversized_body_returns_500_and_runs_nothing() {
    let dir = TempDir::new().unwrap();
    let (app, state) = test_app(test_config(dir.path(), &[], &["touch ran.txt"]));
    let mut events = state.run_events.subscribe();

    let body = vec![b' '; MAX_PAYLOAD_BYTES + 1];
    let response = app
        .oneshot(signed_request(body, SignatureAlgorithm::Sha256))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(events.try_recv().is_err());
    assert!(!dir.path().join("ran.txt").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deliveries_do_not_overlap() {
    let dir = TempDir::new().unwrap();
    let config = test_config(
        dir.path(),
        &[],
        &["echo start >> log.txt; sleep 0.5; echo end >> log.txt"],
    );
    assert!(config.serialize_runs);
    let (app, state) = test_app(config);
    let mut events = state.run_events.subscribe();

    for _ in 0..2 {
        let request = signed_request(push_body(&["a.txt"], &[], &[]), SignatureAlgorithm::Sha256);
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(next_run(&mut events).await.status, RunStatus::Success);
    assert_eq!(next_run(&mut events).await.status, RunStatus::Success);
    assert_eq!(
        fs::read_to_string(dir.path().join("log.txt")).unwrap(),
        "start\nend\nstart\nend\n"
    );
}
