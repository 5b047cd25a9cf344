//! CI build env sync after a deploy

use tracing::{debug, info, warn};

use crate::ci::BuildSecret;
use crate::deploy::Deployer;
use crate::errors::ReleaseError;
use crate::models::deployment::DeployedRelease;
use crate::models::release::{GitActionConfig, Release};
use crate::models::values::ReleaseValues;

impl Deployer {
    /// Bring CI state in line with a successful deploy.
    ///
    /// Only application releases with a git action config are synced. The
    /// stored image repository follows the deployed one, then the build env
    /// read from `env_values` is pushed when the workflow version asks for
    /// it. Failures are returned, never raised.
    pub(crate) async fn sync_ci(
        &self,
        release: &Release,
        deployed: &DeployedRelease,
        env_values: &ReleaseValues,
    ) -> Vec<String> {
        let kind = match deployed.kind() {
            Ok(kind) => kind,
            Err(ReleaseError::UnrecognizedKind(chart)) => {
                debug!("Chart {} of {} is not built from source, skipping CI sync", chart, release.name);
                return Vec::new();
            }
            Err(e) => return vec![e.to_string()],
        };

        let Some(git_action) = &release.git_action_config else {
            debug!("{} has no git action config, skipping CI sync", release.name);
            return Vec::new();
        };

        let mut errors = Vec::new();

        if let Err(e) = self.persist_image_repository(release, deployed).await {
            warn!("Failed to update image repository of {}: {}", release.name, e);
            errors.push(e.to_string());
        }

        match self.push_build_env(release, git_action, env_values).await {
            Ok(true) => info!("Pushed build env of {} ({:?}) to CI", release.name, kind),
            Ok(false) => debug!(
                "CI workflow version {} of {} does not read build env secrets",
                git_action.version, release.name
            ),
            Err(e) => {
                warn!("Failed to sync build env of {}: {}", release.name, e);
                errors.push(e.to_string());
            }
        }

        errors
    }

    async fn persist_image_repository(
        &self,
        release: &Release,
        deployed: &DeployedRelease,
    ) -> Result<(), ReleaseError> {
        let repository = deployed.config.image_repository()?;
        if repository == release.image_repo_uri {
            return Ok(());
        }

        self.store.update_image_repo_uri(release.id, &repository).await?;
        info!(
            "Image repository of {} changed from {} to {}",
            release.name, release.image_repo_uri, repository
        );
        Ok(())
    }

    /// Returns whether a secret was pushed
    async fn push_build_env(
        &self,
        release: &Release,
        git_action: &GitActionConfig,
        env_values: &ReleaseValues,
    ) -> Result<bool, ReleaseError> {
        if !self.secret_gate.allows(&git_action.version)? {
            return Ok(false);
        }

        let (owner, repo) = git_action.owner_and_repo()?;
        let secret = BuildSecret {
            owner: owner.to_string(),
            repo: repo.to_string(),
            installation_id: git_action.github_installation_id,
            name: BuildSecret::secret_name(&release.name),
            env: env_values.build_env()?,
        };

        self.ci.push_build_secret(&secret).await?;
        Ok(true)
    }
}
