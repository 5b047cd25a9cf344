//! HTTP request handlers

use std::sync::Arc;

use api_models::{
    AppendStepRequest, ClusterQuery, DeployResponse, GitActionConfigRequest, HealthResponse,
    NotificationConfigRequest, NotificationConfigResponse, ReleaseQuery, ReleaseResponse,
    RollbackRequest, SubEventResponse, UpdateImagesRequest, UpdateImagesResponse,
    UpgradeRequest, VersionResponse, WebhookQuery,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use crate::models::release::ReleaseKey;
use crate::server::errors::ApiResult;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Health check handler
pub async fn health_handler() -> Json<HealthResponse> {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "release-api".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> Json<VersionResponse> {
    Json(version_info())
}

fn release_key(query: ReleaseQuery, name: String) -> ReleaseKey {
    ReleaseKey::new(query.cluster_id, query.namespace, name)
}

// =================================== STEPS ====================================== //

/// List the reported steps of a release
pub async fn list_steps_handler(
    State(state): State<Arc<ServerState>>,
    Path((_project_id, name)): Path<(u64, String)>,
    query: Result<Query<ReleaseQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<SubEventResponse>>> {
    let Query(query) = query?;
    let key = release_key(query, name);

    let steps = state.event_log.list_steps(&key).await?;
    Ok(Json(steps.iter().map(|s| s.to_response()).collect()))
}

/// Report a build or deploy step of a release
pub async fn append_step_handler(
    State(state): State<Arc<ServerState>>,
    Path((_project_id, name)): Path<(u64, String)>,
    body: Result<Json<AppendStepRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubEventResponse>)> {
    let Json(request) = body?;
    let key = ReleaseKey::new(request.cluster_id, request.namespace, name);

    let step = state.event_log.append_step(&key, request.event.into()).await?;
    Ok((StatusCode::CREATED, Json(step.to_response())))
}

// =============================== WEBHOOK TOKENS ================================= //

/// Read a release record, including its webhook token
pub async fn get_webhook_token_handler(
    State(state): State<Arc<ServerState>>,
    Path((_project_id, name)): Path<(u64, String)>,
    query: Result<Query<ReleaseQuery>, QueryRejection>,
) -> ApiResult<Json<ReleaseResponse>> {
    let Query(query) = query?;
    let key = release_key(query, name);

    let release = state.deployer.get_release(&key).await?;
    Ok(Json(release.to_response()))
}

/// Register a release and issue its webhook token
pub async fn create_webhook_token_handler(
    State(state): State<Arc<ServerState>>,
    Path((project_id, name)): Path<(u64, String)>,
    query: Result<Query<ReleaseQuery>, QueryRejection>,
) -> ApiResult<(StatusCode, Json<ReleaseResponse>)> {
    let Query(query) = query?;
    let key = release_key(query, name);

    let release = state.deployer.create_webhook_token(project_id, &key).await?;
    Ok((StatusCode::CREATED, Json(release.to_response())))
}

/// Link a release to the workflow that builds it
pub async fn set_git_action_config_handler(
    State(state): State<Arc<ServerState>>,
    Path((_project_id, name)): Path<(u64, String)>,
    query: Result<Query<ReleaseQuery>, QueryRejection>,
    body: Result<Json<GitActionConfigRequest>, JsonRejection>,
) -> ApiResult<Json<ReleaseResponse>> {
    let Query(query) = query?;
    let Json(request) = body?;
    let key = release_key(query, name);

    let release = state.deployer.set_git_action_config(&key, request.into()).await?;
    Ok(Json(release.to_response()))
}

/// Choose which deploy outcomes of a release are announced
pub async fn set_notification_config_handler(
    State(state): State<Arc<ServerState>>,
    Path((_project_id, name)): Path<(u64, String)>,
    query: Result<Query<ReleaseQuery>, QueryRejection>,
    body: Result<Json<NotificationConfigRequest>, JsonRejection>,
) -> ApiResult<Json<NotificationConfigResponse>> {
    let Query(query) = query?;
    let Json(request) = body?;
    let key = release_key(query, name);

    let config = state
        .deployer
        .set_notification_config(&key, request.enabled, request.success, request.failure)
        .await?;
    Ok(Json(config.to_response()))
}

// ================================== DEPLOYS ===================================== //

/// Upgrade a release with new values
pub async fn upgrade_handler(
    State(state): State<Arc<ServerState>>,
    Path((project_id, name)): Path<(u64, String)>,
    query: Result<Query<ReleaseQuery>, QueryRejection>,
    body: Result<Json<UpgradeRequest>, JsonRejection>,
) -> ApiResult<Json<DeployResponse>> {
    let Query(query) = query?;
    let Json(request) = body?;
    let key = release_key(query, name);

    let report = state
        .deployer
        .upgrade_release(project_id, &key, &request.values, request.chart_version.as_deref())
        .await?;
    Ok(Json(report.to_response()))
}

/// Roll a release back to a revision
pub async fn rollback_handler(
    State(state): State<Arc<ServerState>>,
    Path((_project_id, name)): Path<(u64, String)>,
    query: Result<Query<ReleaseQuery>, QueryRejection>,
    body: Result<Json<RollbackRequest>, JsonRejection>,
) -> ApiResult<Json<DeployResponse>> {
    let Query(query) = query?;
    let Json(request) = body?;
    let key = release_key(query, name);

    let report = state.deployer.rollback_release(&key, request.revision).await?;
    Ok(Json(report.to_response()))
}

/// Point every job using an image repository at a new tag
pub async fn update_images_handler(
    State(state): State<Arc<ServerState>>,
    Path(_project_id): Path<u64>,
    query: Result<Query<ClusterQuery>, QueryRejection>,
    body: Result<Json<UpdateImagesRequest>, JsonRejection>,
) -> ApiResult<Json<UpdateImagesResponse>> {
    let Query(query) = query?;
    let Json(request) = body?;

    let report = state
        .deployer
        .update_job_images(query.cluster_id, &request.image_repo_uri, &request.tag)
        .await?;
    Ok(Json(UpdateImagesResponse {
        total: report.total,
        updated: report.updated,
        errors: report.errors,
    }))
}

/// Deploy webhook called by CI after an image push
pub async fn webhook_handler(
    State(state): State<Arc<ServerState>>,
    Path(token): Path<String>,
    query: Result<Query<WebhookQuery>, QueryRejection>,
) -> ApiResult<Json<DeployResponse>> {
    let Query(query) = query?;

    let report = state.deployer.redeploy_from_webhook(&token, &query.commit).await?;
    Ok(Json(report.to_response()))
}
