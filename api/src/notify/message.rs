//! Deploy notification context and rendering

use url::Url;

use crate::errors::ReleaseError;
use crate::models::deployment::ReleaseStatus;

/// Everything a channel needs to report one deploy attempt
#[derive(Debug, Clone, PartialEq)]
pub struct DeployNotification {
    pub project_id: u64,
    pub cluster_id: u64,
    pub cluster_name: String,
    pub name: String,
    pub namespace: String,
    /// Dashboard link to the release
    pub url: String,
    pub status: ReleaseStatus,
    pub version: Option<u32>,
    /// Failure detail, set when the upgrade failed
    pub info: Option<String>,
}

impl DeployNotification {
    pub fn is_failure(&self) -> bool {
        self.status == ReleaseStatus::Failed
    }

    /// Render the message text posted to chat channels
    pub fn render(&self) -> String {
        let target = format!(
            "`{}` in namespace `{}` on cluster `{}`",
            self.name, self.namespace, self.cluster_name
        );

        match self.status {
            ReleaseStatus::Deployed => {
                let version = self
                    .version
                    .map(|v| format!(" (revision {})", v))
                    .unwrap_or_default();
                format!(
                    ":rocket: Application {} was successfully deployed{}. <{}|View the release>",
                    target, version, self.url
                )
            }
            ReleaseStatus::Failed => {
                let mut text = format!(
                    ":x: Application {} failed to deploy. <{}|View the status>",
                    target, self.url
                );
                if let Some(info) = self.info.as_deref().filter(|i| !i.is_empty()) {
                    text.push_str(&format!("\n```\n{}\n```", info));
                }
                text
            }
            ReleaseStatus::PendingInstall
            | ReleaseStatus::PendingUpgrade
            | ReleaseStatus::PendingRollback => format!(
                ":hourglass_flowing_sand: Application {} is being deployed. <{}|View the progress>",
                target, self.url
            ),
            other => format!(
                "Application {} finished with status `{}`. <{}|View the release>",
                target,
                other.as_str(),
                self.url
            ),
        }
    }
}

/// `{server_url}/applications/{cluster}/{namespace}/{name}?project_id={id}`
pub fn release_url(
    server_url: &str,
    cluster_name: &str,
    namespace: &str,
    name: &str,
    project_id: u64,
) -> Result<String, ReleaseError> {
    let mut url = Url::parse(server_url)?;
    url.path_segments_mut()
        .map_err(|_| ReleaseError::ConfigError(format!("server url {} cannot be a base", server_url)))?
        .pop_if_empty()
        .extend(["applications", cluster_name, namespace, name]);
    url.query_pairs_mut()
        .append_pair("project_id", &project_id.to_string());
    Ok(url.to_string())
}
