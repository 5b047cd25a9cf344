//! HTTP routing tests

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use release_api::server::serve::router;
use release_api::server::state::ServerState;

use crate::fakes::Harness;

fn app(harness: &Harness) -> Router {
    router(Arc::new(ServerState::new(
        harness.event_log.clone(),
        harness.deployer.clone(),
    )))
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let harness = Harness::new();

    let (status, body) = send(app(&harness), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "release-api");
}

#[tokio::test]
async fn test_append_then_list_steps() {
    let harness = Harness::new();
    harness
        .release("web", "web", json!({"image": {"repository": "acct/web"}}))
        .await;

    let (status, created) = send(
        app(&harness),
        "POST",
        "/api/projects/1/releases/web/steps",
        Some(json!({
            "event": {"event_id": "build", "name": "Build", "index": 1, "status": 2},
            "namespace": "default",
            "cluster_id": 10
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], 2);

    let (status, steps) = send(
        app(&harness),
        "GET",
        "/api/projects/1/releases/web/steps?cluster_id=10&namespace=default",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(steps.as_array().unwrap().len(), 1);
    assert_eq!(steps[0]["event_id"], "build");
}

#[tokio::test]
async fn test_undecodable_step_body() {
    let harness = Harness::new();

    let (status, body) = send(
        app(&harness),
        "POST",
        "/api/projects/1/releases/web/steps",
        Some(json!({"event": {"event_id": "build", "status": 9}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 600);
}

#[tokio::test]
async fn test_webhook_errors() {
    let harness = Harness::new();
    harness
        .release(
            "web",
            "web",
            json!({"auto_deploy": false, "image": {"repository": "acct/web", "tag": "v1"}}),
        )
        .await;

    let (status, body) = send(app(&harness), "POST", "/api/webhooks/deploy/unknown?commit=abc", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 602);

    let (status, body) = send(app(&harness), "POST", "/api/webhooks/deploy/token-web", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 601);

    let (status, body) = send(app(&harness), "POST", "/api/webhooks/deploy/token-web?commit=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"][0].as_str().unwrap().contains("disabled"));
    assert_eq!(harness.engine.upgrade_count(), 0);
}

#[tokio::test]
async fn test_webhook_deploy() {
    let harness = Harness::new();
    harness
        .release("web", "web", json!({"image": {"repository": "acct/web", "tag": "v1"}}))
        .await;

    let (status, body) = send(app(&harness), "POST", "/api/webhooks/deploy/token-web?commit=abc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "deployed");
    assert_eq!(body["version"], 2);
}

#[tokio::test]
async fn test_batch_image_update_route() {
    let harness = Harness::new();
    harness
        .release("nightly", "job", json!({"image": {"repository": "acct/jobs", "tag": "v1"}}))
        .await;

    let (status, body) = send(
        app(&harness),
        "POST",
        "/api/projects/1/releases/image/update/batch?cluster_id=10",
        Some(json!({"image_repo_uri": "acct/jobs", "tag": "v2"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["updated"], 1);
}

#[tokio::test]
async fn test_provision_linked_configs() {
    let harness = Harness::new();
    harness
        .release("web", "web", json!({"image": {"repository": "acct/web", "tag": "v1"}}))
        .await;

    let (status, body) = send(
        app(&harness),
        "PUT",
        "/api/projects/1/releases/web/notifications?cluster_id=10&namespace=default",
        Some(json!({"success": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], true);
    assert_eq!(body["success"], false);
    let config_id = body["id"].clone();

    let (status, body) = send(
        app(&harness),
        "PUT",
        "/api/projects/1/releases/web/git_action_config?cluster_id=10&namespace=default",
        Some(json!({
            "git_repo": "acme/web",
            "image_repo_uri": "acct/web",
            "github_installation_id": 42,
            "version": "v0.0.1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["git_action_config"]["github_installation_id"], 42);
    assert_eq!(body["notification_config"], config_id);

    let (status, body) = send(
        app(&harness),
        "PUT",
        "/api/projects/1/releases/web/git_action_config?cluster_id=10&namespace=default",
        Some(json!({
            "git_repo": "web",
            "image_repo_uri": "acct/web",
            "github_installation_id": 42,
            "version": "v0.0.1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 601);
}
