//! Values upgrades and rollbacks

use tracing::{info, instrument};

use crate::deploy::{DeployReport, Deployer};
use crate::engine::ChartRef;
use crate::errors::ReleaseError;
use crate::models::release::ReleaseKey;
use crate::models::values::ReleaseValues;

impl Deployer {
    /// Upgrade a release with a new values document, optionally moving it to
    /// another version of its chart.
    ///
    /// The release record is optional here: releases without one are
    /// upgraded and notified without CI sync.
    #[instrument(skip(self, values_yaml))]
    pub async fn upgrade_release(
        &self,
        project_id: u64,
        key: &ReleaseKey,
        values_yaml: &str,
        chart_version: Option<&str>,
    ) -> Result<DeployReport, ReleaseError> {
        let values = ReleaseValues::from_yaml(values_yaml)
            .map_err(|e| ReleaseError::ValidationError(format!("invalid values: {}", e)))?;

        let chart = match chart_version {
            Some(version) => Some(self.chart_ref(key, version).await?),
            None => None,
        };

        let release = self.store.read_release(key).await?;
        let notifier = self.notifier_for(release.as_ref(), project_id).await?;
        let notification = self.notification_for(project_id, key).await?;

        let (deployed, mut integration_errors) = self
            .apply(key, &values, chart.as_ref(), &notifier, notification)
            .await?;
        info!("Upgraded {} to revision {}", key, deployed.version);

        if let Some(release) = &release {
            integration_errors.extend(self.sync_ci(release, &deployed, &values).await);
        }

        Ok(DeployReport {
            release: deployed,
            integration_errors,
        })
    }

    /// Roll a release back to `revision`.
    ///
    /// The engine records a rollback as a new revision carrying the restored
    /// values; that revision is what gets reported and synced to CI. Not
    /// notified.
    #[instrument(skip(self))]
    pub async fn rollback_release(
        &self,
        key: &ReleaseKey,
        revision: u32,
    ) -> Result<DeployReport, ReleaseError> {
        self.engine.rollback(key, revision).await?;
        let deployed = self.engine.get_release(key, None).await?;
        info!(
            "Rolled back {} to revision {} as revision {}",
            key, revision, deployed.version
        );

        let integration_errors = match self.store.read_release(key).await? {
            Some(release) => self.sync_ci(&release, &deployed, &deployed.config).await,
            None => Vec::new(),
        };

        Ok(DeployReport {
            release: deployed,
            integration_errors,
        })
    }

    async fn chart_ref(&self, key: &ReleaseKey, version: &str) -> Result<ChartRef, ReleaseError> {
        let current = self.engine.get_release(key, None).await?;
        let repo_url = self.charts.lookup(&current.chart_name).await?;

        Ok(ChartRef {
            repo_url,
            name: current.chart_name,
            version: version.to_string(),
        })
    }
}
