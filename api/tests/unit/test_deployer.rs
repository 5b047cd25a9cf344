//! Deploy flow tests

use release_api::engine::ChartRef;
use release_api::errors::ReleaseError;
use release_api::models::release::GitActionConfig;
use release_api::storage::store::Store;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use crate::fakes::{Harness, PROJECT_ID};

const PLACEHOLDER: &str = "public.ecr.aws/o1j4x7p4/hello-porter";

fn image_of(values: &release_api::models::values::ReleaseValues) -> (String, String) {
    let image = &values.as_map()["image"];
    (
        image["repository"].as_str().unwrap().to_string(),
        image["tag"].as_str().unwrap().to_string(),
    )
}

// ================================== WEBHOOK ===================================== //

#[tokio::test]
async fn test_webhook_replaces_placeholder_with_ci_repository() {
    let harness = Harness::new();
    let release = harness
        .release(
            "web",
            "web",
            json!({
                "image": {"repository": PLACEHOLDER, "tag": "latest", "pullPolicy": "Always"},
                "container": {"env": {"normal": {"PORT": 8080, "NODE_ENV": "production"}}}
            }),
        )
        .await;
    harness.link_ci(&release, "v0.0.1").await;

    let report = assert_ok!(harness.deployer.redeploy_from_webhook("token-web", "abc123").await);
    assert!(report.integration_errors.is_empty());

    let (key, applied, chart) = harness.engine.last_upgrade();
    assert_eq!(key, Harness::key("web"));
    assert!(chart.is_none());
    assert_eq!(image_of(&applied), ("acct/my-app".to_string(), "abc123".to_string()));
    assert_eq!(applied.as_map()["image"]["pullPolicy"], "Always");

    // The stored repository follows the deploy and the build env is pushed.
    let stored = harness.store.read_release(&key).await.unwrap().unwrap();
    assert_eq!(stored.image_repo_uri, "acct/my-app");

    let pushes = harness.ci.pushes.lock().unwrap().clone();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].owner, "acme");
    assert_eq!(pushes[0].repo, "my-app");
    assert_eq!(pushes[0].name, "ENV_WEB");
    assert_eq!(pushes[0].env["PORT"], "8080");

    let sent = harness.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("successfully deployed"));
    assert!(sent[0].contains("https://dashboard.example.com/applications/prod/default/web?project_id=1"));
}

#[tokio::test]
async fn test_webhook_keeps_non_placeholder_repository() {
    let harness = Harness::new();
    let release = harness
        .release("web", "web", json!({"image": {"repository": "acct/web", "tag": "v1"}}))
        .await;
    harness.link_ci(&release, "v0.0.1").await;

    assert_ok!(harness.deployer.redeploy_from_webhook("token-web", "def456").await);

    let (_, applied, _) = harness.engine.last_upgrade();
    assert_eq!(image_of(&applied), ("acct/web".to_string(), "def456".to_string()));
}

#[tokio::test]
async fn test_webhook_respects_disabled_auto_deploy() {
    let harness = Harness::new();
    harness
        .release(
            "web",
            "web",
            json!({"auto_deploy": false, "image": {"repository": "acct/web", "tag": "v1"}}),
        )
        .await;

    let err = assert_err!(harness.deployer.redeploy_from_webhook("token-web", "abc123").await);
    assert!(matches!(err, ReleaseError::AutoDeployDisabled(_)));
    assert_eq!(harness.engine.upgrade_count(), 0);
    assert!(harness.sent().is_empty());
}

#[tokio::test]
async fn test_webhook_with_unknown_token_is_not_found() {
    let harness = Harness::new();

    let err = assert_err!(harness.deployer.redeploy_from_webhook("nope", "abc123").await);
    assert!(matches!(err, ReleaseError::NotFound(_)));
    assert_eq!(harness.engine.upgrade_count(), 0);
}

#[tokio::test]
async fn test_failed_upgrade_notifies_once_and_skips_ci() {
    let harness = Harness::new();
    let release = harness
        .release("web", "web", json!({"image": {"repository": "acct/web", "tag": "v1"}}))
        .await;
    harness.link_ci(&release, "v0.0.1").await;
    harness.engine.fail_upgrades("helm timed out");

    let err = assert_err!(harness.deployer.redeploy_from_webhook("token-web", "abc123").await);
    let expected = ReleaseError::EngineError("helm timed out".to_string()).to_string();
    assert!(matches!(&err, ReleaseError::UpgradeFailed(info) if *info == expected));

    let sent = harness.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("failed to deploy"));
    assert!(sent[0].contains(&expected));
    assert_eq!(harness.ci.push_count(), 0);
}

#[tokio::test]
async fn test_notification_config_suppresses_success() {
    let harness = Harness::new();
    let release = harness
        .release("web", "web", json!({"image": {"repository": "acct/web", "tag": "v1"}}))
        .await;
    let config = harness.store.create_notification_config(true, false, true).await.unwrap();
    harness
        .store
        .set_notification_config(release.id, Some(config.id))
        .await
        .unwrap();

    assert_ok!(harness.deployer.redeploy_from_webhook("token-web", "abc123").await);
    assert_eq!(harness.engine.upgrade_count(), 1);
    assert!(harness.sent().is_empty());
}

// ================================== CI SYNC ===================================== //

#[tokio::test]
async fn test_job_with_newer_workflow_persists_repository_without_push() {
    let harness = Harness::new();
    let release = harness
        .release("cron", "job", json!({"image": {"repository": "acct/old-app", "tag": "v1"}}))
        .await;
    harness.link_ci(&release, "v1.2.0").await;

    let report = assert_ok!(
        harness
            .deployer
            .upgrade_release(
                PROJECT_ID,
                &Harness::key("cron"),
                "image:\n  repository: acct/new-app\n  tag: v2\n",
                None,
            )
            .await
    );
    assert!(report.integration_errors.is_empty());

    let stored = harness.store.read_release(&Harness::key("cron")).await.unwrap().unwrap();
    assert_eq!(stored.image_repo_uri, "acct/new-app");
    assert_eq!(harness.ci.push_count(), 0);
}

#[tokio::test]
async fn test_malformed_workflow_version_is_reported_not_fatal() {
    let harness = Harness::new();
    let release = harness
        .release("web", "web", json!({"image": {"repository": "acct/web", "tag": "v1"}}))
        .await;
    harness.link_ci(&release, "latest").await;

    let report = assert_ok!(harness.deployer.redeploy_from_webhook("token-web", "abc123").await);
    assert_eq!(report.integration_errors.len(), 1);
    assert!(report.integration_errors[0].contains("invalid tool version"));
    assert_eq!(harness.ci.push_count(), 0);
}

#[tokio::test]
async fn test_unrecognized_chart_skips_ci_sync() {
    let harness = Harness::new();
    let release = harness
        .release("cache", "redis", json!({"image": {"repository": "bitnami/redis", "tag": "7"}}))
        .await;
    harness.link_ci(&release, "v0.0.1").await;

    let report = assert_ok!(harness.deployer.redeploy_from_webhook("token-cache", "7.2").await);
    assert!(report.integration_errors.is_empty());
    assert_eq!(harness.ci.push_count(), 0);
}

// ============================== UPGRADE / ROLLBACK ============================== //

#[tokio::test]
async fn test_upgrade_to_chart_version_resolves_repository() {
    let harness = Harness::new();
    harness
        .release("web", "web", json!({"image": {"repository": "acct/web", "tag": "v1"}}))
        .await;

    assert_ok!(
        harness
            .deployer
            .upgrade_release(
                PROJECT_ID,
                &Harness::key("web"),
                "image:\n  repository: acct/web\n  tag: v2\n",
                Some("0.51.0"),
            )
            .await
    );

    let (_, _, chart) = harness.engine.last_upgrade();
    assert_eq!(
        chart,
        Some(ChartRef {
            repo_url: "https://charts.example.com".to_string(),
            name: "web".to_string(),
            version: "0.51.0".to_string(),
        })
    );
}

#[tokio::test]
async fn test_upgrade_rejects_malformed_values() {
    let harness = Harness::new();
    harness
        .release("web", "web", json!({"image": {"repository": "acct/web", "tag": "v1"}}))
        .await;

    let err = assert_err!(
        harness
            .deployer
            .upgrade_release(PROJECT_ID, &Harness::key("web"), "- just\n- a list\n", None)
            .await
    );
    assert!(matches!(err, ReleaseError::ValidationError(_)));
    assert_eq!(harness.engine.upgrade_count(), 0);
}

#[tokio::test]
async fn test_rollback_is_not_notified() {
    let harness = Harness::new();
    harness
        .release("web", "web", json!({"image": {"repository": "acct/web", "tag": "v1"}}))
        .await;

    assert_ok!(harness.deployer.rollback_release(&Harness::key("web"), 1).await);
    assert_eq!(harness.engine.rollbacks.lock().unwrap().len(), 1);
    assert!(harness.sent().is_empty());
}

#[tokio::test]
async fn test_rollback_reports_the_new_revision() {
    let harness = Harness::new();
    let release = harness
        .release(
            "web",
            "web",
            json!({
                "image": {"repository": "acct/web", "tag": "v1"},
                "container": {"env": {"normal": {"RELEASE": "one"}}}
            }),
        )
        .await;
    harness.link_ci(&release, "v0.0.1").await;

    assert_ok!(
        harness
            .deployer
            .upgrade_release(
                PROJECT_ID,
                &Harness::key("web"),
                "image:\n  repository: acct/web\n  tag: v2\ncontainer:\n  env:\n    normal:\n      RELEASE: two\n",
                None,
            )
            .await
    );

    let report = assert_ok!(harness.deployer.rollback_release(&Harness::key("web"), 1).await);
    let response = report.to_response();
    assert_eq!(response.status, "deployed");
    assert_eq!(response.version, Some(3));

    // The build env follows the restored values.
    let pushes = harness.ci.pushes.lock().unwrap().clone();
    assert_eq!(pushes.last().unwrap().env["RELEASE"], "one");
}

#[tokio::test]
async fn test_rollback_to_unknown_revision_fails() {
    let harness = Harness::new();
    harness
        .release("web", "web", json!({"image": {"repository": "acct/web", "tag": "v1"}}))
        .await;

    let err = assert_err!(harness.deployer.rollback_release(&Harness::key("web"), 7).await);
    assert!(matches!(err, ReleaseError::NotFound(_)));
}

// ================================= TOKENS ======================================= //

#[tokio::test]
async fn test_create_webhook_token_once() {
    let harness = Harness::new();
    harness.engine.install(
        "api",
        "web",
        crate::fakes::values(json!({"image": {"repository": "acct/api", "tag": "v1"}})),
    );
    let key = Harness::key("api");

    let release = assert_ok!(harness.deployer.create_webhook_token(PROJECT_ID, &key).await);
    assert_eq!(release.webhook_token.len(), 32);
    assert_eq!(release.image_repo_uri, "acct/api");

    let fetched = assert_ok!(harness.deployer.get_release(&key).await);
    assert_eq!(fetched.webhook_token, release.webhook_token);

    let err = assert_err!(harness.deployer.create_webhook_token(PROJECT_ID, &key).await);
    assert!(matches!(err, ReleaseError::Conflict(_)));
}

#[tokio::test]
async fn test_create_webhook_token_requires_image_repository() {
    let harness = Harness::new();
    harness
        .engine
        .install("api", "web", crate::fakes::values(json!({"image": {"tag": "v1"}})));

    let err = assert_err!(
        harness
            .deployer
            .create_webhook_token(PROJECT_ID, &Harness::key("api"))
            .await
    );
    assert!(matches!(err, ReleaseError::MalformedConfig(_)));
}

#[tokio::test]
async fn test_provisioned_notification_config_gates_announcements() {
    let harness = Harness::new();
    harness
        .release("web", "web", json!({"image": {"repository": "acct/web", "tag": "v1"}}))
        .await;
    let key = Harness::key("web");

    let config = assert_ok!(harness.deployer.set_notification_config(&key, true, false, true).await);
    let stored = harness.store.read_release(&key).await.unwrap().unwrap();
    assert_eq!(stored.notification_config, Some(config.id));

    assert_ok!(harness.deployer.redeploy_from_webhook("token-web", "abc123").await);
    assert!(harness.sent().is_empty());

    // A later config replaces the link.
    let replaced = assert_ok!(harness.deployer.set_notification_config(&key, true, true, true).await);
    assert_ne!(replaced.id, config.id);
    assert_ok!(harness.deployer.redeploy_from_webhook("token-web", "def456").await);
    assert_eq!(harness.sent().len(), 1);
}

#[tokio::test]
async fn test_provisioned_git_action_config_enables_ci_sync() {
    let harness = Harness::new();
    harness
        .release("web", "web", json!({"image": {"repository": "acct/web", "tag": "v1"}}))
        .await;
    let key = Harness::key("web");

    let release = assert_ok!(
        harness
            .deployer
            .set_git_action_config(
                &key,
                GitActionConfig {
                    git_repo: "acme/web".to_string(),
                    git_branch: "main".to_string(),
                    image_repo_uri: "acct/web".to_string(),
                    dockerfile_path: String::new(),
                    folder_path: ".".to_string(),
                    github_installation_id: 7,
                    version: "v0.0.1".to_string(),
                },
            )
            .await
    );
    assert_eq!(release.git_action_config.unwrap().github_installation_id, 7);

    assert_ok!(harness.deployer.redeploy_from_webhook("token-web", "abc123").await);
    let pushes = harness.ci.pushes.lock().unwrap().clone();
    assert_eq!(pushes.len(), 1);
    assert_eq!((pushes[0].owner.as_str(), pushes[0].installation_id), ("acme", 7));
}

#[tokio::test]
async fn test_git_action_config_rejects_bare_repository() {
    let harness = Harness::new();
    harness
        .release("web", "web", json!({"image": {"repository": "acct/web", "tag": "v1"}}))
        .await;

    let err = assert_err!(
        harness
            .deployer
            .set_git_action_config(
                &Harness::key("web"),
                GitActionConfig {
                    git_repo: "web".to_string(),
                    git_branch: String::new(),
                    image_repo_uri: "acct/web".to_string(),
                    dockerfile_path: String::new(),
                    folder_path: String::new(),
                    github_installation_id: 7,
                    version: "v0.0.1".to_string(),
                },
            )
            .await
    );
    assert!(matches!(err, ReleaseError::ValidationError(_)));

    let err = assert_err!(
        harness
            .deployer
            .set_notification_config(&Harness::key("missing"), true, true, true)
            .await
    );
    assert!(matches!(err, ReleaseError::NotFound(_)));
}

// ================================== BATCH ======================================= //

#[tokio::test]
async fn test_batch_update_collects_failures() {
    let harness = Harness::new();
    for name in ["nightly", "hourly", "weekly"] {
        harness
            .release(name, "job", json!({"image": {"repository": "acct/jobs", "tag": "v1"}}))
            .await;
    }
    harness.engine.fail_fetch("hourly");

    let report = assert_ok!(harness.deployer.update_job_images(10, "acct/jobs", "v2").await);
    assert_eq!(report.total, 3);
    assert_eq!(report.updated, 2);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("hourly"));

    let upgrades = harness.engine.upgrades.lock().unwrap().clone();
    assert_eq!(upgrades.len(), 2);
    for (_, values, _) in upgrades {
        assert_eq!(image_of(&values), ("acct/jobs".to_string(), "v2".to_string()));
        assert_eq!(values.as_map()["paused"], true);
    }
}

#[tokio::test]
async fn test_batch_update_skips_non_job_charts() {
    let harness = Harness::new();
    harness
        .release("web", "web", json!({"image": {"repository": "acct/shared", "tag": "v1"}}))
        .await;
    harness
        .release("migrate", "job", json!({"image": {"repository": "acct/shared", "tag": "v1"}}))
        .await;

    let report = assert_ok!(harness.deployer.update_job_images(10, "acct/shared", "v2").await);
    assert_eq!(report.total, 2);
    assert_eq!(report.updated, 1);
    assert!(report.errors.is_empty());
    assert_eq!(harness.engine.last_upgrade().0, Harness::key("migrate"));
}
