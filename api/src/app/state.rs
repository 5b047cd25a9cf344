//! Application state management

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::app::options::{AppOptions, UpstreamOptions};
use crate::cache::chart_urls::{ChartUrlCache, HelmRepoIndex};
use crate::ci::github::GithubActions;
use crate::ci::SecretGate;
use crate::deploy::Deployer;
use crate::engine::helm::HelmGateway;
use crate::errors::ReleaseError;
use crate::events::log::EventLog;
use crate::filesys::file::File;
use crate::http::client::HttpClient;
use crate::notify::SlackChannelFactory;
use crate::storage::memory::MemoryStore;

/// Main application state
pub struct AppState {
    /// Release records and step logs
    pub store: Arc<MemoryStore>,

    /// Step log operations
    pub event_log: Arc<EventLog>,

    /// Deploy flows
    pub deployer: Arc<Deployer>,

    /// Chart repository lookups
    pub chart_urls: Arc<ChartUrlCache>,

    /// Where the store is snapshotted on shutdown
    pub snapshot_file: Option<File>,
}

impl AppState {
    /// Initialize application state.
    ///
    /// The returned handle warms the chart URL cache in the background.
    pub async fn init(options: &AppOptions) -> Result<(Self, JoinHandle<()>), ReleaseError> {
        info!("Initializing application state...");

        // Load the store
        let snapshot_file = options.snapshot_path.as_ref().map(File::new);
        let store = match &snapshot_file {
            Some(file) => MemoryStore::load(file).await?,
            None => MemoryStore::new(),
        };
        for cluster in &options.seed_clusters {
            store.add_cluster(cluster.clone());
        }
        for integration in &options.seed_slack_integrations {
            store.add_slack_integration(integration.clone());
        }
        let store = Arc::new(store);

        // Upstream clients
        let engine = Arc::new(HelmGateway::new(upstream_client(&options.helm_gateway)?));
        let ci = Arc::new(GithubActions::new(upstream_client(&options.ci)?));

        let web_client = reqwest::Client::builder()
            .timeout(options.helm_gateway.timeout)
            .build()?;
        let channels = Arc::new(SlackChannelFactory::new(web_client.clone()));
        let chart_urls = Arc::new(ChartUrlCache::new(Box::new(HelmRepoIndex::new(
            web_client,
            options.chart_repos.clone(),
        ))));

        let event_log = Arc::new(EventLog::new(store.clone()));
        let deployer = Arc::new(
            Deployer::new(
                store.clone(),
                engine,
                ci,
                channels,
                chart_urls.clone(),
                options.deployer.clone(),
            )
            .with_secret_gate(SecretGate::new(&options.secret_constraint)?),
        );

        let warm = chart_urls.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = warm.refresh().await {
                warn!("Chart URL cache not warmed: {}", e);
            }
        });

        let state = Self {
            store,
            event_log,
            deployer,
            chart_urls,
            snapshot_file,
        };

        Ok((state, handle))
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), ReleaseError> {
        info!("Shutting down application state...");
        if let Some(file) = &self.snapshot_file {
            self.store.save(file).await?;
            info!("Store snapshot written to {}", file.path().display());
        }
        Ok(())
    }
}

fn upstream_client(options: &UpstreamOptions) -> Result<HttpClient, ReleaseError> {
    let client = HttpClient::new(&options.base_url, options.timeout)?;
    Ok(match &options.token {
        Some(token) => client.with_token(SecretString::from(token.expose_secret().to_string())),
        None => client,
    })
}
