//! Main application run loop

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppState;
use crate::errors::ReleaseError;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the release API until the shutdown signal fires
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ReleaseError> {
    info!("Initializing release API...");

    // Create shutdown channel
    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    if let Err(e) = init(&options, shutdown_tx.clone(), &mut shutdown_manager).await {
        error!("Failed to start release API: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    options: &AppOptions,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), ReleaseError> {
    let (app_state, app_state_handle) = AppState::init(options).await?;
    let app_state = Arc::new(app_state);
    shutdown_manager.with_app_state(app_state.clone(), Box::pin(async move {
        if let Err(e) = app_state_handle.await {
            error!("Application state task failed: {}", e);
        }
    }))?;

    init_server(options, app_state, shutdown_manager, shutdown_tx.subscribe()).await
}

async fn init_server(
    options: &AppOptions,
    app_state: Arc<AppState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), ReleaseError> {
    info!("Initializing HTTP server...");

    let server_state = ServerState::new(app_state.event_log.clone(), app_state.deployer.clone());

    let server_handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_server_handle(server_handle)
}

// ================================= SHUTDOWN ===================================== //

struct AppStateShutdownParams {
    state: Arc<AppState>,
    state_handle: Pin<Box<dyn Future<Output = ()> + Send>>,
}

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    app_state: Option<AppStateShutdownParams>,
    server_handle: Option<JoinHandle<Result<(), ReleaseError>>>,
}

impl ShutdownManager {
    fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            app_state: None,
            server_handle: None,
        }
    }

    fn with_app_state(
        &mut self,
        state: Arc<AppState>,
        state_handle: Pin<Box<dyn Future<Output = ()> + Send>>,
    ) -> Result<(), ReleaseError> {
        if self.app_state.is_some() {
            return Err(ReleaseError::ServerError("app_state already set".to_string()));
        }
        self.app_state = Some(AppStateShutdownParams { state, state_handle });
        Ok(())
    }

    fn with_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), ReleaseError>>,
    ) -> Result<(), ReleaseError> {
        if self.server_handle.is_some() {
            return Err(ReleaseError::ServerError("server_handle already set".to_string()));
        }
        self.server_handle = Some(handle);
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ReleaseError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, forcing shutdown...",
                    self.lifecycle_options.max_shutdown_delay
                );
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), ReleaseError> {
        info!("Shutting down release API...");

        // 1. HTTP server, so no request writes after the snapshot
        if let Some(handle) = self.server_handle.take() {
            handle.await.map_err(|e| ReleaseError::ServerError(e.to_string()))??;
        }

        // 2. App state
        if let Some(app_state) = self.app_state.take() {
            app_state.state_handle.await;
            app_state.state.shutdown().await?;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
