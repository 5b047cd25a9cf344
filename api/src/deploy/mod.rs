//! Deploy orchestration
//!
//! [`Deployer`] drives every flow that changes what runs in a cluster: the
//! deploy webhook, values upgrades, rollbacks and the batch job image update.
//! Each flow ends the same way: notify the release's channels about the
//! outcome, then, for releases built from source, sync the CI build env.

pub mod batch;
pub mod ci_sync;
pub mod tokens;
pub mod upgrade;
pub mod webhook;

use std::sync::Arc;

use api_models::DeployResponse;
use tracing::warn;

use crate::cache::chart_urls::ChartUrlCache;
use crate::ci::{CiProvider, SecretGate};
use crate::engine::{ChartRef, DeploymentEngine};
use crate::errors::ReleaseError;
use crate::models::deployment::{DeployedRelease, ReleaseStatus};
use crate::models::release::{Release, ReleaseKey};
use crate::models::values::ReleaseValues;
use crate::notify::message::{release_url, DeployNotification};
use crate::notify::{ChannelFactory, Notifier};
use crate::storage::store::Store;

/// Images of the starter app. A release still running one of these is
/// switched to its CI image repository on the first webhook deploy.
pub const DEFAULT_PLACEHOLDER_IMAGES: &[&str] = &[
    "porterdev/hello-porter",
    "public.ecr.aws/o1j4x7p4/hello-porter",
    "porterdev/hello-porter-job",
    "public.ecr.aws/o1j4x7p4/hello-porter-job",
];

/// Deployer options
#[derive(Debug, Clone)]
pub struct DeployerOptions {
    /// Public dashboard URL used in notification links
    pub server_url: String,

    /// Repositories treated as placeholders
    pub placeholder_images: Vec<String>,
}

impl Default for DeployerOptions {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            placeholder_images: DEFAULT_PLACEHOLDER_IMAGES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Result of an applied deploy
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub release: DeployedRelease,

    /// Notification and CI sync failures; none of them failed the deploy
    pub integration_errors: Vec<String>,
}

impl DeployReport {
    pub fn to_response(&self) -> DeployResponse {
        DeployResponse {
            status: self.release.status.as_str().to_string(),
            version: Some(self.release.version),
            integration_errors: self.integration_errors.clone(),
        }
    }
}

/// Collaborators of the deploy flows
pub struct Deployer {
    store: Arc<dyn Store>,
    engine: Arc<dyn DeploymentEngine>,
    ci: Arc<dyn CiProvider>,
    channels: Arc<dyn ChannelFactory>,
    charts: Arc<ChartUrlCache>,
    secret_gate: SecretGate,
    options: DeployerOptions,
}

impl Deployer {
    pub fn new(
        store: Arc<dyn Store>,
        engine: Arc<dyn DeploymentEngine>,
        ci: Arc<dyn CiProvider>,
        channels: Arc<dyn ChannelFactory>,
        charts: Arc<ChartUrlCache>,
        options: DeployerOptions,
    ) -> Self {
        Self {
            store,
            engine,
            ci,
            channels,
            charts,
            secret_gate: SecretGate::default(),
            options,
        }
    }

    pub fn with_secret_gate(mut self, gate: SecretGate) -> Self {
        self.secret_gate = gate;
        self
    }

    /// Assemble the notifier for a release.
    ///
    /// Channels are the project's chat integrations; the release's
    /// notification config, if any, gates them.
    async fn notifier_for(
        &self,
        release: Option<&Release>,
        project_id: u64,
    ) -> Result<Notifier, ReleaseError> {
        let config = match release.and_then(|r| r.notification_config) {
            Some(id) => {
                let config = self.store.read_notification_config(id).await?;
                if config.is_none() {
                    warn!("Notification config {} is missing, notifying on every outcome", id);
                }
                config
            }
            None => None,
        };

        let integrations = match self.store.list_slack_integrations(project_id).await {
            Ok(integrations) => integrations,
            Err(e) => {
                warn!("Failed to list chat integrations for project {}: {}", project_id, e);
                Vec::new()
            }
        };

        Ok(Notifier::new(config, self.channels.channels(&integrations)))
    }

    /// Notification context for a release, before the outcome is known
    async fn notification_for(
        &self,
        project_id: u64,
        key: &ReleaseKey,
    ) -> Result<DeployNotification, ReleaseError> {
        let cluster_name = match self.store.read_cluster(key.cluster_id).await? {
            Some(cluster) => cluster.name,
            None => format!("cluster-{}", key.cluster_id),
        };

        let url = release_url(
            &self.options.server_url,
            &cluster_name,
            &key.namespace,
            &key.name,
            project_id,
        )?;

        Ok(DeployNotification {
            project_id,
            cluster_id: key.cluster_id,
            cluster_name,
            name: key.name.clone(),
            namespace: key.namespace.clone(),
            url,
            status: ReleaseStatus::PendingUpgrade,
            version: None,
            info: None,
        })
    }

    /// Upgrade, then notify exactly once with the upgrade's true outcome
    async fn apply(
        &self,
        key: &ReleaseKey,
        values: &ReleaseValues,
        chart: Option<&ChartRef>,
        notifier: &Notifier,
        mut notification: DeployNotification,
    ) -> Result<(DeployedRelease, Vec<String>), ReleaseError> {
        match self.engine.upgrade(key, values, chart).await {
            Ok(deployed) => {
                notification.status = deployed.status;
                notification.version = Some(deployed.version);
                let failures = notifier.notify(&notification).await;
                Ok((deployed, failures))
            }
            Err(e) => {
                let info = e.to_string();
                notification.status = ReleaseStatus::Failed;
                notification.info = Some(info.clone());
                notifier.notify(&notification).await;
                Err(ReleaseError::UpgradeFailed(info))
            }
        }
    }
}
