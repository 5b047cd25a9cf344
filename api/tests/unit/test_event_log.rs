//! Release step log tests

use api_models::EventStatus;
use release_api::errors::ReleaseError;
use release_api::models::event::NewStep;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use crate::fakes::Harness;

fn step(event_id: &str, index: i64, status: EventStatus) -> NewStep {
    NewStep {
        event_id: event_id.to_string(),
        name: format!("Step {}", event_id),
        index,
        status,
        info: String::new(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_appends_share_one_container() {
    let harness = Harness::new();
    let release = harness
        .release("web", "web", json!({"image": {"repository": "acct/web"}}))
        .await;
    let key = Harness::key("web");

    let (a, b) = tokio::join!(
        {
            let log = harness.event_log.clone();
            let key = key.clone();
            tokio::spawn(async move { log.append_step(&key, step("build", 1, EventStatus::InProgress)).await })
        },
        {
            let log = harness.event_log.clone();
            let key = key.clone();
            tokio::spawn(async move { log.append_step(&key, step("push", 2, EventStatus::InProgress)).await })
        }
    );
    let a = assert_ok!(a.unwrap());
    let b = assert_ok!(b.unwrap());

    assert_eq!(a.event_container_id, b.event_container_id);
    assert_eq!(harness.store.containers_for_release(release.id), 1);

    let steps = assert_ok!(harness.event_log.list_steps(&key).await);
    assert_eq!(steps.len(), 2);
}

#[tokio::test]
async fn test_list_without_container_is_empty() {
    let harness = Harness::new();
    harness
        .release("web", "web", json!({"image": {"repository": "acct/web"}}))
        .await;

    let steps = assert_ok!(harness.event_log.list_steps(&Harness::key("web")).await);
    assert!(steps.is_empty());
}

#[tokio::test]
async fn test_repeated_event_id_appends_a_new_step() {
    let harness = Harness::new();
    harness
        .release("web", "web", json!({"image": {"repository": "acct/web"}}))
        .await;
    let key = Harness::key("web");

    assert_ok!(harness.event_log.append_step(&key, step("build", 1, EventStatus::InProgress)).await);
    assert_ok!(harness.event_log.append_step(&key, step("build", 1, EventStatus::Success)).await);

    let steps = assert_ok!(harness.event_log.list_steps(&key).await);
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].status, EventStatus::InProgress);
    assert_eq!(steps[1].status, EventStatus::Success);
    assert!(steps.iter().all(|s| s.event_id == "build"));
}

#[tokio::test]
async fn test_unknown_release_is_not_found() {
    let harness = Harness::new();

    let result = harness
        .event_log
        .append_step(&Harness::key("ghost"), step("build", 1, EventStatus::Failed))
        .await;
    let err = assert_err!(result);
    assert!(matches!(err, ReleaseError::NotFound(_)));
}
