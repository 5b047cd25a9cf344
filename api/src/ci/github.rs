//! GitHub Actions secrets, pushed through the CI bridge service

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::ci::{BuildSecret, CiProvider};
use crate::errors::ReleaseError;
use crate::http::client::HttpClient;

#[derive(Debug, Serialize)]
struct SecretBody<'a> {
    installation_id: u64,
    env: &'a BTreeMap<String, String>,
}

/// CI provider backed by the GitHub Actions bridge
pub struct GithubActions {
    client: HttpClient,
}

impl GithubActions {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CiProvider for GithubActions {
    async fn push_build_secret(&self, secret: &BuildSecret) -> Result<(), ReleaseError> {
        info!(
            "Updating secret {} on {}/{} ({} variables)",
            secret.name,
            secret.owner,
            secret.repo,
            secret.env.len()
        );

        let url = self.client.endpoint(&[
            "repos",
            &secret.owner,
            &secret.repo,
            "actions",
            "secrets",
            &secret.name,
        ])?;
        let body = SecretBody {
            installation_id: secret.installation_id,
            env: &secret.env,
        };

        self.client
            .put::<(), _>(url, &body)
            .await
            .map_err(|e| ReleaseError::IntegrationError(format!("could not update github secret: {}", e)))
    }
}
