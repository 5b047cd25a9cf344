//! Release API models
//!
//! Request and response bodies shared by the release API server and its clients.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Error body returned for every failed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u32,
    pub errors: Vec<String>,
}

// ================================== STEPS ==================================== //

/// Status of a reported release step.
///
/// Encoded on the wire as an integer: 1 = success, 2 = in progress, 3 = failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStatus {
    Success,
    InProgress,
    Failed,
}

impl EventStatus {
    pub fn code(&self) -> u8 {
        match self {
            EventStatus::Success => 1,
            EventStatus::InProgress => 2,
            EventStatus::Failed => 3,
        }
    }

    pub fn from_code(code: u64) -> Result<Self, String> {
        match code {
            1 => Ok(EventStatus::Success),
            2 => Ok(EventStatus::InProgress),
            3 => Ok(EventStatus::Failed),
            other => Err(format!("unrecognized event status: {}", other)),
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventStatus::Success => "success",
            EventStatus::InProgress => "in_progress",
            EventStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl Serialize for EventStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for EventStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code = u64::deserialize(deserializer)?;
        EventStatus::from_code(code).map_err(serde::de::Error::custom)
    }
}

/// One step reported by a deploy workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepInput {
    pub event_id: String,
    pub name: String,
    pub index: i64,
    pub status: EventStatus,
    #[serde(default)]
    pub info: String,
}

/// Body of a step report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendStepRequest {
    pub event: StepInput,
    pub namespace: String,
    pub cluster_id: u64,
}

/// A step as returned by the steps listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubEventResponse {
    pub event_id: String,
    pub name: String,
    pub index: i64,
    pub status: EventStatus,
    pub info: String,
    pub time: i64,
}

// ================================= RELEASES ================================== //

/// Query identifying a release within a cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseQuery {
    pub cluster_id: u64,
    pub namespace: String,
}

/// CI linkage of a release
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitActionConfigResponse {
    pub git_repo: String,
    pub git_branch: String,
    pub image_repo_uri: String,
    pub dockerfile_path: String,
    pub folder_path: String,
    pub github_installation_id: u64,
    pub version: String,
}

/// A tracked release record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseResponse {
    pub id: u64,
    pub name: String,
    pub namespace: String,
    pub cluster_id: u64,
    pub project_id: u64,
    pub webhook_token: String,
    pub image_repo_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_action_config: Option<GitActionConfigResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_config: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_container: Option<u64>,
}

/// Body linking a release to the workflow that builds it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitActionConfigRequest {
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
    pub version: String,
}

fn enabled_by_default() -> bool {
    true
}

/// Body choosing which deploy outcomes are announced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfigRequest {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default = "enabled_by_default")]
    pub success: bool,
    #[serde(default = "enabled_by_default")]
    pub failure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfigResponse {
    pub id: u64,
    pub enabled: bool,
    pub success: bool,
    pub failure: bool,
}

// ================================= DEPLOYS =================================== //

/// Query of the deploy webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookQuery {
    pub commit: String,
}

/// Body of a values upgrade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeRequest {
    /// Values document in YAML
    pub values: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_version: Option<String>,
}

/// Body of a rollback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackRequest {
    pub revision: u32,
}

/// Outcome of a deploy operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Notification or CI sync failures that did not fail the deploy
    #[serde(default)]
    pub integration_errors: Vec<String>,
}

/// Query of the batch image update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterQuery {
    pub cluster_id: u64,
}

/// Body of the batch image update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateImagesRequest {
    pub image_repo_uri: String,
    pub tag: String,
}

/// Outcome of the batch image update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateImagesResponse {
    /// Releases matching the image repository
    pub total: usize,
    /// Job releases that were upgraded
    pub updated: usize,
    pub errors: Vec<String>,
}
