//! Release records, webhook tokens and the configs linked to them

use tracing::{debug, info};

use crate::deploy::Deployer;
use crate::errors::ReleaseError;
use crate::models::release::{GitActionConfig, NewRelease, NotificationConfig, Release, ReleaseKey};
use crate::utils::generate_webhook_token;

impl Deployer {
    /// Register a deployed release and issue its deploy webhook token.
    ///
    /// Fails with `Conflict` when the release already has a record.
    pub async fn create_webhook_token(
        &self,
        project_id: u64,
        key: &ReleaseKey,
    ) -> Result<Release, ReleaseError> {
        let deployed = self.engine.get_release(key, None).await?;
        let image_repo_uri = deployed.config.image_repository()?;

        let release = self
            .store
            .create_release(NewRelease {
                project_id,
                key: key.clone(),
                webhook_token: generate_webhook_token(),
                image_repo_uri,
            })
            .await?;

        info!("Issued deploy webhook token for {}", key);
        Ok(release)
    }

    pub async fn get_release(&self, key: &ReleaseKey) -> Result<Release, ReleaseError> {
        self.store
            .read_release(key)
            .await?
            .ok_or_else(|| ReleaseError::NotFound(format!("release {}", key)))
    }

    /// Link the workflow that builds the release, replacing any previous link
    pub async fn set_git_action_config(
        &self,
        key: &ReleaseKey,
        config: GitActionConfig,
    ) -> Result<Release, ReleaseError> {
        config
            .owner_and_repo()
            .map_err(|e| ReleaseError::ValidationError(e.to_string()))?;
        if config.image_repo_uri.is_empty() {
            return Err(ReleaseError::ValidationError(
                "git action config needs an image repository".to_string(),
            ));
        }

        let release = self.get_release(key).await?;
        let updated = self
            .store
            .set_git_action_config(release.id, Some(config))
            .await?;

        info!("Linked {} to a build workflow", key);
        Ok(updated)
    }

    /// Choose which deploy outcomes of the release are announced
    pub async fn set_notification_config(
        &self,
        key: &ReleaseKey,
        enabled: bool,
        success: bool,
        failure: bool,
    ) -> Result<NotificationConfig, ReleaseError> {
        let release = self.get_release(key).await?;
        if let Some(previous) = release.notification_config {
            debug!("Replacing notification config {} of {}", previous, key);
        }

        let config = self
            .store
            .create_notification_config(enabled, success, failure)
            .await?;
        self.store
            .set_notification_config(release.id, Some(config.id))
            .await?;

        info!(
            "Notifications for {}: enabled={} success={} failure={}",
            key, enabled, success, failure
        );
        Ok(config)
    }
}
