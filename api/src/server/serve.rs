//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::ReleaseError;
use crate::server::handlers::{
    append_step_handler, create_webhook_token_handler, get_webhook_token_handler,
    health_handler, list_steps_handler, rollback_handler, set_git_action_config_handler,
    set_notification_config_handler, update_images_handler, upgrade_handler, version_handler,
    webhook_handler,
};
use crate::server::state::ServerState;

/// Build the API router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Release steps
        .route(
            "/api/projects/{project_id}/releases/{name}/steps",
            get(list_steps_handler).post(append_step_handler),
        )
        // Webhook tokens
        .route(
            "/api/projects/{project_id}/releases/{name}/webhook_token",
            get(get_webhook_token_handler).post(create_webhook_token_handler),
        )
        // Linked configs
        .route(
            "/api/projects/{project_id}/releases/{name}/git_action_config",
            put(set_git_action_config_handler),
        )
        .route(
            "/api/projects/{project_id}/releases/{name}/notifications",
            put(set_notification_config_handler),
        )
        // Deploys
        .route(
            "/api/projects/{project_id}/releases/{name}/upgrade",
            post(upgrade_handler),
        )
        .route(
            "/api/projects/{project_id}/releases/{name}/rollback",
            post(rollback_handler),
        )
        .route(
            "/api/projects/{project_id}/releases/image/update/batch",
            post(update_images_handler),
        )
        .route("/api/webhooks/deploy/{token}", post(webhook_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), ReleaseError>>, ReleaseError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ReleaseError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ReleaseError::ServerError(e.to_string()))
    });

    Ok(handle)
}
