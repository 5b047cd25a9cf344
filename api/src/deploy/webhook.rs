//! Deploy webhook

use tracing::{info, instrument};

use crate::deploy::{DeployReport, Deployer};
use crate::errors::ReleaseError;
use crate::models::release::GitActionConfig;
use crate::models::values::ImageRef;

impl Deployer {
    /// Redeploy the release owning `token` with the image tag `commit`.
    ///
    /// Rejected before any upgrade when the token is unknown or the release
    /// has `auto_deploy: false`. Once the upgrade runs, its outcome is
    /// always notified.
    #[instrument(skip(self, token))]
    pub async fn redeploy_from_webhook(
        &self,
        token: &str,
        commit: &str,
    ) -> Result<DeployReport, ReleaseError> {
        let commit = commit.trim();
        if commit.is_empty() {
            return Err(ReleaseError::ValidationError("commit is required".to_string()));
        }

        let release = self
            .store
            .read_release_by_webhook_token(token)
            .await?
            .ok_or_else(|| ReleaseError::NotFound("release not found with given webhook".to_string()))?;
        let key = release.key();

        let current = self.engine.get_release(&key, None).await?;
        let mut values = current.config;

        if values.auto_deploy_disabled() {
            info!("Webhook deploy rejected for {}: auto deploy is disabled", key);
            return Err(ReleaseError::AutoDeployDisabled(key.to_string()));
        }

        let repository = self.webhook_repository(
            values.image_repository()?,
            release.git_action_config.as_ref(),
        );
        info!("Webhook deploy of {} with image {}:{}", key, repository, commit);
        values.set_image(&ImageRef {
            repository,
            tag: commit.to_string(),
        });

        let notifier = self.notifier_for(Some(&release), release.project_id).await?;
        let notification = self.notification_for(release.project_id, &key).await?;
        let (deployed, mut integration_errors) =
            self.apply(&key, &values, None, &notifier, notification).await?;

        integration_errors.extend(self.sync_ci(&release, &deployed, &values).await);

        Ok(DeployReport {
            release: deployed,
            integration_errors,
        })
    }

    /// Repository to deploy: the current one, unless it is a placeholder
    /// image and the release has a CI image repository to replace it with
    pub fn webhook_repository(
        &self,
        current: String,
        git_action: Option<&GitActionConfig>,
    ) -> String {
        match git_action {
            Some(git_action) if self.options.placeholder_images.iter().any(|p| p == &current) => {
                git_action.image_repo_uri.clone()
            }
            _ => current,
        }
    }
}
