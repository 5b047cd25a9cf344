//! Deployment engine interface
//!
//! The engine owns release installation state in the cluster. This service
//! only reads a release's values, upgrades it with new values, and rolls it
//! back.

pub mod helm;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ReleaseError;
use crate::models::deployment::DeployedRelease;
use crate::models::release::ReleaseKey;
use crate::models::values::ReleaseValues;

/// A chart to upgrade to, instead of the release's current chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRef {
    pub repo_url: String,
    pub name: String,
    pub version: String,
}

#[async_trait]
pub trait DeploymentEngine: Send + Sync {
    /// Read a release; `None` selects the latest revision
    async fn get_release(
        &self,
        target: &ReleaseKey,
        revision: Option<u32>,
    ) -> Result<DeployedRelease, ReleaseError>;

    /// Upgrade a release to the given values
    async fn upgrade(
        &self,
        target: &ReleaseKey,
        values: &ReleaseValues,
        chart: Option<&ChartRef>,
    ) -> Result<DeployedRelease, ReleaseError>;

    async fn rollback(&self, target: &ReleaseKey, revision: u32) -> Result<(), ReleaseError>;
}
