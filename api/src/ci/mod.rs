//! CI provider integration
//!
//! Releases built from source carry a git action config. After a deploy, the
//! build-time environment of the release is pushed to the CI provider as a
//! repository secret, so the next build sees the same variables.

pub mod github;

use std::collections::BTreeMap;

use async_trait::async_trait;
use semver::{Version, VersionReq};
use serde::Serialize;

use crate::errors::ReleaseError;

/// Workflow versions that read build env from a repository secret
pub const BUILD_ENV_SECRET_CONSTRAINT: &str = "<0.1.0";

/// A build env secret for one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildSecret {
    pub owner: String,
    pub repo: String,
    pub installation_id: u64,
    /// Secret name, derived from the release name
    pub name: String,
    pub env: BTreeMap<String, String>,
}

impl BuildSecret {
    /// `ENV_<RELEASE>`, upper-cased with dashes turned into underscores
    pub fn secret_name(release_name: &str) -> String {
        format!("ENV_{}", release_name.replace('-', "_").to_uppercase())
    }
}

#[async_trait]
pub trait CiProvider: Send + Sync {
    async fn push_build_secret(&self, secret: &BuildSecret) -> Result<(), ReleaseError>;
}

/// Version constraint deciding whether a CI config gets a build env secret
#[derive(Debug, Clone)]
pub struct SecretGate {
    constraint: VersionReq,
}

impl SecretGate {
    pub fn new(constraint: &str) -> Result<Self, ReleaseError> {
        let constraint = VersionReq::parse(constraint)
            .map_err(|e| ReleaseError::ConfigError(format!("invalid CI version constraint: {}", e)))?;
        Ok(Self { constraint })
    }

    /// Check a stored tool version. A leading `v` is accepted.
    ///
    /// A version that does not parse is an error; the caller skips the push.
    pub fn allows(&self, version: &str) -> Result<bool, ReleaseError> {
        let version = Version::parse(version.trim().trim_start_matches('v'))?;
        Ok(self.constraint.matches(&version))
    }
}

impl Default for SecretGate {
    fn default() -> Self {
        Self {
            constraint: VersionReq::parse(BUILD_ENV_SECRET_CONSTRAINT)
                .unwrap_or(VersionReq::STAR),
        }
    }
}
