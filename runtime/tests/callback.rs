// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Webhook delivery of background extraction results.

mod common;

use common::{orchestrator, policy, Behavior, Spy};
use newsparse_runtime::callback::{CallbackDispatcher, WebhookRequest};
use newsparse_runtime::ExtractError;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn job(webhook_url: String) -> WebhookRequest {
    serde_json::from_value(json!({
        "url": "https://blocked-example.test/story",
        "webhook_url": webhook_url,
        "metadata": { "batch": "2024-03-05", "row": 12 },
    }))
    .unwrap()
}

fn dispatcher(dir: &std::path::Path) -> CallbackDispatcher {
    let (orch, _) = orchestrator(
        policy(&["blocked-example.test"], &[], &[]),
        Behavior::FailLaunch,
        Spy::default(),
        dir,
    );
    CallbackDispatcher::new(orch)
}

#[tokio::test]
async fn test_result_is_posted_to_webhook() {
    let dir = tempfile::tempdir().unwrap();
    let hook = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&hook)
        .await;

    let (ack, task) = dispatcher(dir.path()).spawn(job(format!("{}/hook", hook.uri())));
    assert!(ack.accepted);
    assert_eq!(ack.url, "https://blocked-example.test/story");
    assert_eq!(ack.webhook_url, format!("{}/hook", hook.uri()));

    task.await.unwrap();

    let requests = hook.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["original_url"], "https://blocked-example.test/story");
    assert_eq!(body["metadata"]["row"], 12);
    assert_eq!(body["routing_decision"], "block");
    assert!(body["error"].is_string());
    assert!(body.get("parsed_data").is_none());
    assert!(chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_rejected_delivery_is_swallowed_by_spawned_task() {
    let dir = tempfile::tempdir().unwrap();
    let hook = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&hook)
        .await;

    let dispatcher = dispatcher(dir.path());
    let (_ack, task) = dispatcher.spawn(job(hook.uri()));
    assert!(task.await.is_ok());

    let err = dispatcher.run(job(hook.uri())).await.unwrap_err();
    assert!(matches!(err, ExtractError::Callback(_)));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_unreachable_webhook_reports_callback_error() {
    let dir = tempfile::tempdir().unwrap();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = dispatcher(dir.path())
        .run(job(format!("http://127.0.0.1:{port}/hook")))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E_CALLBACK");
}
