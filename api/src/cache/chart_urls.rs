//! Chart repository URL cache
//!
//! Maps a chart name to the repository that serves it. Entries are served
//! stale; a miss triggers one refresh from the configured repository indexes
//! before the lookup gives up.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::ReleaseError;

/// Source of chart name → repository URL mappings
#[async_trait]
pub trait ChartIndex: Send + Sync {
    async fn fetch(&self) -> Result<HashMap<String, String>, ReleaseError>;
}

#[derive(Debug, Deserialize)]
struct IndexFile {
    #[serde(default)]
    entries: BTreeMap<String, serde_yaml::Value>,
}

/// Reads `index.yaml` from each configured Helm repository
pub struct HelmRepoIndex {
    client: reqwest::Client,
    repo_urls: Vec<String>,
}

impl HelmRepoIndex {
    pub fn new(client: reqwest::Client, repo_urls: Vec<String>) -> Self {
        Self { client, repo_urls }
    }
}

#[async_trait]
impl ChartIndex for HelmRepoIndex {
    async fn fetch(&self) -> Result<HashMap<String, String>, ReleaseError> {
        let mut urls = HashMap::new();

        for repo_url in &self.repo_urls {
            let index_url = format!("{}/index.yaml", repo_url.trim_end_matches('/'));
            let body = self
                .client
                .get(&index_url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;

            let index: IndexFile = serde_yaml::from_str(&body)?;
            debug!("Repository {} serves {} charts", repo_url, index.entries.len());

            // Earlier repositories win on name clashes.
            for chart in index.entries.into_keys() {
                urls.entry(chart).or_insert_with(|| repo_url.clone());
            }
        }

        Ok(urls)
    }
}

/// Process-wide chart lookup state
pub struct ChartUrlCache {
    entries: RwLock<HashMap<String, String>>,
    refreshed_at: RwLock<Option<DateTime<Utc>>>,
    index: Box<dyn ChartIndex>,
}

impl ChartUrlCache {
    pub fn new(index: Box<dyn ChartIndex>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            refreshed_at: RwLock::new(None),
            index,
        }
    }

    /// Get a cached URL without refreshing
    pub fn get(&self, chart: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(chart).cloned()
    }

    /// Get the URL for a chart, refreshing once on a miss
    pub async fn lookup(&self, chart: &str) -> Result<String, ReleaseError> {
        if let Some(url) = self.get(chart) {
            return Ok(url);
        }

        debug!("Chart {} not cached, refreshing repository index", chart);
        self.refresh().await?;

        self.get(chart)
            .ok_or_else(|| ReleaseError::NotFound(format!("chart {}", chart)))
    }

    /// Replace the cached mappings. On failure the stale entries are kept.
    pub async fn refresh(&self) -> Result<(), ReleaseError> {
        let fetched = match self.index.fetch().await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("Failed to refresh chart repository index: {}", e);
                return Err(e);
            }
        };

        info!("Refreshed chart repository index ({} charts)", fetched.len());
        {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            *entries = fetched;
        }
        let mut refreshed_at = self.refreshed_at.write().unwrap_or_else(|e| e.into_inner());
        *refreshed_at = Some(Utc::now());

        Ok(())
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        *self.refreshed_at.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
