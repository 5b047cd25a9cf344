//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::deploy::DeployerOptions;
use crate::models::release::{Cluster, SlackIntegration};
use crate::storage::settings::Settings;

/// Main application options
#[derive(Debug)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Deploy flow options
    pub deployer: DeployerOptions,

    /// Helm gateway client
    pub helm_gateway: UpstreamOptions,

    /// CI bridge client
    pub ci: UpstreamOptions,

    /// Workflow versions that get the build env secret
    pub secret_constraint: String,

    /// Helm repositories searched for chart URLs
    pub chart_repos: Vec<String>,

    /// Store snapshot file
    pub snapshot_path: Option<PathBuf>,

    pub seed_clusters: Vec<Cluster>,
    pub seed_slack_integrations: Vec<SlackIntegration>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            server: ServerOptions::default(),
            deployer: DeployerOptions::default(),
            helm_gateway: UpstreamOptions::new("http://localhost:8090"),
            ci: UpstreamOptions::new("http://localhost:8091"),
            secret_constraint: crate::ci::BUILD_ENV_SECRET_CONSTRAINT.to_string(),
            chart_repos: Vec::new(),
            snapshot_path: None,
            seed_clusters: Vec::new(),
            seed_slack_integrations: Vec::new(),
        }
    }
}

impl AppOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            deployer: DeployerOptions {
                server_url: settings.server_url.clone(),
                placeholder_images: settings.placeholder_images.clone(),
            },
            helm_gateway: UpstreamOptions {
                base_url: settings.helm_gateway.base_url.clone(),
                token: None,
                timeout: Duration::from_secs(settings.helm_gateway.timeout_secs),
            },
            ci: UpstreamOptions {
                base_url: settings.ci.base_url.clone(),
                token: settings
                    .ci
                    .token
                    .as_ref()
                    .map(|t| SecretString::from(t.expose_secret().to_string())),
                timeout: Duration::from_secs(settings.ci.timeout_secs),
            },
            secret_constraint: settings.ci.secret_constraint.clone(),
            chart_repos: settings.chart_repos.clone(),
            snapshot_path: settings.snapshot_path.clone(),
            seed_clusters: settings.seed.clusters.clone(),
            seed_slack_integrations: settings
                .seed
                .slack_integrations
                .iter()
                .map(|i| SlackIntegration {
                    id: i.id,
                    project_id: i.project_id,
                    webhook_url: i.webhook_url.expose_secret().to_string(),
                    channel: i.channel.clone(),
                })
                .collect(),
        }
    }
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Client options for an upstream service
#[derive(Debug)]
pub struct UpstreamOptions {
    pub base_url: String,
    pub token: Option<SecretString>,
    pub timeout: Duration,
}

impl UpstreamOptions {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}
