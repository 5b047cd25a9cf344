//! Helm gateway client

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use url::Url;

use crate::engine::{ChartRef, DeploymentEngine};
use crate::errors::ReleaseError;
use crate::http::client::HttpClient;
use crate::models::deployment::DeployedRelease;
use crate::models::release::ReleaseKey;
use crate::models::values::ReleaseValues;

#[derive(Debug, Serialize)]
struct UpgradeBody<'a> {
    values: &'a ReleaseValues,
    #[serde(skip_serializing_if = "Option::is_none")]
    chart: Option<&'a ChartRef>,
}

#[derive(Debug, Serialize)]
struct RollbackBody {
    revision: u32,
}

/// Deployment engine reached over HTTP
pub struct HelmGateway {
    client: HttpClient,
}

impl HelmGateway {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    fn release_url(&self, target: &ReleaseKey, action: Option<&str>) -> Result<Url, ReleaseError> {
        target.validate()?;

        let cluster_id = target.cluster_id.to_string();
        let mut segments = vec![
            "clusters",
            cluster_id.as_str(),
            "namespaces",
            target.namespace.as_str(),
            "releases",
            target.name.as_str(),
        ];
        segments.extend(action);
        self.client.endpoint(&segments)
    }
}

/// Gateway failures other than a missing release surface as engine errors.
fn engine_error(err: ReleaseError) -> ReleaseError {
    match err {
        ReleaseError::NotFound(_) | ReleaseError::ValidationError(_) | ReleaseError::EngineError(_) => err,
        ReleaseError::UpstreamError { status, body } => {
            ReleaseError::EngineError(format!("helm gateway returned {}: {}", status, body))
        }
        other => ReleaseError::EngineError(other.to_string()),
    }
}

#[async_trait]
impl DeploymentEngine for HelmGateway {
    async fn get_release(
        &self,
        target: &ReleaseKey,
        revision: Option<u32>,
    ) -> Result<DeployedRelease, ReleaseError> {
        let mut url = self.release_url(target, None)?;
        if let Some(revision) = revision {
            url.query_pairs_mut()
                .append_pair("revision", &revision.to_string());
        }
        self.client.get(url).await.map_err(engine_error)
    }

    async fn upgrade(
        &self,
        target: &ReleaseKey,
        values: &ReleaseValues,
        chart: Option<&ChartRef>,
    ) -> Result<DeployedRelease, ReleaseError> {
        info!("Upgrading release {} via {}", target, self.client.base_url());
        let url = self.release_url(target, Some("upgrade"))?;
        self.client
            .post(url, &UpgradeBody { values, chart })
            .await
            .map_err(engine_error)
    }

    async fn rollback(&self, target: &ReleaseKey, revision: u32) -> Result<(), ReleaseError> {
        info!("Rolling back release {} to revision {}", target, revision);
        let url = self.release_url(target, Some("rollback"))?;
        self.client
            .post(url, &RollbackBody { revision })
            .await
            .map_err(engine_error)
    }
}
