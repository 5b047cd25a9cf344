//! Release records

use api_models::{
    GitActionConfigRequest, GitActionConfigResponse, NotificationConfigResponse, ReleaseResponse,
};
use serde::{Deserialize, Serialize};

use crate::errors::ReleaseError;

/// Identity of a deployed instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReleaseKey {
    pub cluster_id: u64,
    pub namespace: String,
    pub name: String,
}

impl ReleaseKey {
    pub fn new(cluster_id: u64, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cluster_id,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Check that namespace and name are names the cluster would accept.
    ///
    /// Namespaces are DNS-1123 labels. Release names may be dotted labels
    /// and are capped at 53 characters, as Helm does.
    pub fn validate(&self) -> Result<(), ReleaseError> {
        if self.namespace.len() > 63 || !is_dns_label(&self.namespace) {
            return Err(ReleaseError::ValidationError(format!(
                "namespace '{}' is not a valid DNS-1123 label",
                self.namespace
            )));
        }
        if self.name.len() > 53 || !self.name.split('.').all(is_dns_label) {
            return Err(ReleaseError::ValidationError(format!(
                "release name '{}' is not a valid DNS-1123 name",
                self.name
            )));
        }
        Ok(())
    }
}

fn is_dns_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        }
        _ => false,
    }
}

impl std::fmt::Display for ReleaseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.cluster_id, self.namespace, self.name)
    }
}

/// A deployed application instance tracked by this service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    pub project_id: u64,
    pub cluster_id: u64,
    pub namespace: String,
    pub name: String,

    /// Opaque credential for the deploy webhook
    pub webhook_token: String,

    /// Image repository currently deployed
    pub image_repo_uri: String,

    #[serde(default)]
    pub git_action_config: Option<GitActionConfig>,

    #[serde(default)]
    pub notification_config: Option<u64>,

    /// Attached lazily on the first reported step
    #[serde(default)]
    pub event_container: Option<u64>,
}

impl Release {
    pub fn key(&self) -> ReleaseKey {
        ReleaseKey::new(self.cluster_id, self.namespace.clone(), self.name.clone())
    }

    pub fn to_response(&self) -> ReleaseResponse {
        ReleaseResponse {
            id: self.id,
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            cluster_id: self.cluster_id,
            project_id: self.project_id,
            webhook_token: self.webhook_token.clone(),
            image_repo_uri: self.image_repo_uri.clone(),
            git_action_config: self.git_action_config.as_ref().map(|g| g.to_response()),
            notification_config: self.notification_config,
            event_container: self.event_container,
        }
    }
}

/// Fields of a release record before the store assigns an ID
#[derive(Debug, Clone)]
pub struct NewRelease {
    pub project_id: u64,
    pub key: ReleaseKey,
    pub webhook_token: String,
    pub image_repo_uri: String,
}

/// CI linkage for releases built from source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitActionConfig {
    /// Repository as `owner/name`
    pub git_repo: String,
    #[serde(default)]
    pub git_branch: String,
    pub image_repo_uri: String,
    #[serde(default)]
    pub dockerfile_path: String,
    #[serde(default)]
    pub folder_path: String,
    pub github_installation_id: u64,
    /// Version of the generated workflow files
    pub version: String,
}

impl GitActionConfig {
    /// Split `git_repo` into owner and repository name
    pub fn owner_and_repo(&self) -> Result<(&str, &str), ReleaseError> {
        match self.git_repo.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Ok((owner, repo))
            }
            _ => Err(ReleaseError::MalformedConfig(format!(
                "git repo '{}' is not of the form owner/name",
                self.git_repo
            ))),
        }
    }

    pub fn to_response(&self) -> GitActionConfigResponse {
        GitActionConfigResponse {
            git_repo: self.git_repo.clone(),
            git_branch: self.git_branch.clone(),
            image_repo_uri: self.image_repo_uri.clone(),
            dockerfile_path: self.dockerfile_path.clone(),
            folder_path: self.folder_path.clone(),
            github_installation_id: self.github_installation_id,
            version: self.version.clone(),
        }
    }
}

impl From<GitActionConfigRequest> for GitActionConfig {
    fn from(request: GitActionConfigRequest) -> Self {
        Self {
            git_repo: request.git_repo,
            git_branch: request.git_branch,
            image_repo_uri: request.image_repo_uri,
            dockerfile_path: request.dockerfile_path,
            folder_path: request.folder_path,
            github_installation_id: request.github_installation_id,
            version: request.version,
        }
    }
}

/// Per-release gate on deploy notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub id: u64,
    pub enabled: bool,
    pub success: bool,
    pub failure: bool,
}

impl NotificationConfig {
    pub fn to_response(&self) -> NotificationConfigResponse {
        NotificationConfigResponse {
            id: self.id,
            enabled: self.enabled,
            success: self.success,
            failure: self.failure,
        }
    }
}

/// Project-level Slack incoming webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackIntegration {
    pub id: u64,
    pub project_id: u64,
    pub webhook_url: String,
    #[serde(default)]
    pub channel: Option<String>,
}

/// Cluster the releases are deployed to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: u64,
    pub project_id: u64,
    pub name: String,
}
