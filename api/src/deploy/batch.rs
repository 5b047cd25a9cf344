//! Batch image update of job releases

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::deploy::Deployer;
use crate::engine::DeploymentEngine;
use crate::errors::ReleaseError;
use crate::models::deployment::{ChartKind, DeployedRelease};
use crate::models::release::Release;
use crate::models::values::ImageRef;

/// Outcome of a batch image update
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub total: usize,
    pub updated: usize,
    pub errors: Vec<String>,
}

impl Deployer {
    /// Point every job release of a cluster that uses `image_repo_uri` at
    /// `tag`, paused so the new image only runs on the next trigger.
    ///
    /// One task per release; a failing release does not stop the others.
    #[instrument(skip(self))]
    pub async fn update_job_images(
        &self,
        cluster_id: u64,
        image_repo_uri: &str,
        tag: &str,
    ) -> Result<BatchReport, ReleaseError> {
        let releases = self
            .store
            .list_releases_by_image_repo_uri(cluster_id, image_repo_uri)
            .await?;

        let mut report = BatchReport {
            total: releases.len(),
            ..Default::default()
        };

        let mut tasks = JoinSet::new();
        for release in releases {
            let engine = self.engine.clone();
            let tag = tag.to_string();
            tasks.spawn(async move {
                update_job_image(engine, &release, tag)
                    .await
                    .map_err(|e| format!("{}: {}", release.name, e))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(true)) => report.updated += 1,
                Ok(Ok(false)) => {}
                Ok(Err(e)) => {
                    warn!("Image update failed for {}", e);
                    report.errors.push(e);
                }
                Err(e) => report.errors.push(format!("image update task failed: {}", e)),
            }
        }

        info!(
            "Updated {} of {} releases using {} ({} errors)",
            report.updated,
            report.total,
            image_repo_uri,
            report.errors.len()
        );
        Ok(report)
    }
}

/// Returns whether the release was upgraded
async fn update_job_image(
    engine: Arc<dyn DeploymentEngine>,
    release: &Release,
    tag: String,
) -> Result<bool, ReleaseError> {
    let key = release.key();
    let deployed = engine.get_release(&key, None).await?;
    if !is_job(&deployed)? {
        debug!("Skipping {}: chart {} is not a job", key, deployed.chart_name);
        return Ok(false);
    }

    let mut values = deployed.config;
    values.set_image(&ImageRef {
        repository: release.image_repo_uri.clone(),
        tag,
    });
    values.set_paused(true);

    engine.upgrade(&key, &values, None).await?;
    Ok(true)
}

fn is_job(deployed: &DeployedRelease) -> Result<bool, ReleaseError> {
    match deployed.kind() {
        Ok(ChartKind::Job) => Ok(true),
        Ok(ChartKind::Web) | Ok(ChartKind::Worker) => Ok(false),
        Err(ReleaseError::UnrecognizedKind(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
