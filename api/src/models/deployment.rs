//! Deployed release models, as reported by the deployment engine

use serde::{Deserialize, Serialize};

use crate::errors::ReleaseError;
use crate::models::values::ReleaseValues;

/// Status of a deployed revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseStatus {
    Unknown,
    Deployed,
    Uninstalled,
    Superseded,
    Failed,
    Uninstalling,
    PendingInstall,
    PendingUpgrade,
    PendingRollback,
}

impl ReleaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseStatus::Unknown => "unknown",
            ReleaseStatus::Deployed => "deployed",
            ReleaseStatus::Uninstalled => "uninstalled",
            ReleaseStatus::Superseded => "superseded",
            ReleaseStatus::Failed => "failed",
            ReleaseStatus::Uninstalling => "uninstalling",
            ReleaseStatus::PendingInstall => "pending-install",
            ReleaseStatus::PendingUpgrade => "pending-upgrade",
            ReleaseStatus::PendingRollback => "pending-rollback",
        }
    }
}

/// Application chart kinds that may be built from source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Job,
    Web,
    Worker,
}

impl ChartKind {
    pub fn from_chart_name(name: &str) -> Result<Self, ReleaseError> {
        match name {
            "job" => Ok(ChartKind::Job),
            "web" => Ok(ChartKind::Web),
            "worker" => Ok(ChartKind::Worker),
            other => Err(ReleaseError::UnrecognizedKind(other.to_string())),
        }
    }
}

/// A release revision as read from the cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployedRelease {
    pub name: String,
    pub namespace: String,

    /// Name of the chart the release was installed from
    pub chart_name: String,
    pub chart_version: String,

    /// Revision number
    pub version: u32,
    pub status: ReleaseStatus,

    #[serde(default)]
    pub config: ReleaseValues,
}

impl DeployedRelease {
    pub fn kind(&self) -> Result<ChartKind, ReleaseError> {
        ChartKind::from_chart_name(&self.chart_name)
    }
}
