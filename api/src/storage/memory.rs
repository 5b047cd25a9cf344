//! In-memory store with optional JSON snapshots

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ReleaseError;
use crate::filesys::file::File;
use crate::models::event::{EventContainer, NewStep, SubEvent};
use crate::models::release::{
    Cluster, GitActionConfig, NewRelease, NotificationConfig, Release, ReleaseKey, SlackIntegration,
};
use crate::storage::store::Store;

/// Everything the store holds; also the snapshot file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    releases: BTreeMap<u64, Release>,
    #[serde(default)]
    containers: BTreeMap<u64, EventContainer>,
    #[serde(default)]
    events: Vec<SubEvent>,
    #[serde(default)]
    notification_configs: BTreeMap<u64, NotificationConfig>,
    #[serde(default)]
    slack_integrations: BTreeMap<u64, SlackIntegration>,
    #[serde(default)]
    clusters: BTreeMap<u64, Cluster>,
    #[serde(default)]
    last_id: u64,
}

impl StoreData {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn release_mut(&mut self, release_id: u64) -> Result<&mut Release, ReleaseError> {
        self.releases
            .get_mut(&release_id)
            .ok_or_else(|| ReleaseError::NotFound(format!("release {}", release_id)))
    }
}

/// Store backed by process memory
pub struct MemoryStore {
    data: RwLock<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(StoreData::default()),
        }
    }

    /// Restore from a snapshot file, or start empty if there is none
    pub async fn load(file: &File) -> Result<Self, ReleaseError> {
        if !file.exists().await {
            debug!("No store snapshot at {:?}, starting empty", file.path());
            return Ok(Self::new());
        }

        let data: StoreData = file.read_json().await?;
        info!(
            "Loaded store snapshot: {} releases, {} steps",
            data.releases.len(),
            data.events.len()
        );
        Ok(Self {
            data: RwLock::new(data),
        })
    }

    /// Write the current contents to a snapshot file
    pub async fn save(&self, file: &File) -> Result<(), ReleaseError> {
        let data = self.read().clone();
        file.write_json(&data).await?;
        debug!("Saved store snapshot to {:?}", file.path());
        Ok(())
    }

    pub fn add_cluster(&self, cluster: Cluster) {
        let mut data = self.write();
        data.last_id = data.last_id.max(cluster.id);
        data.clusters.insert(cluster.id, cluster);
    }

    pub fn add_slack_integration(&self, integration: SlackIntegration) {
        let mut data = self.write();
        data.last_id = data.last_id.max(integration.id);
        data.slack_integrations.insert(integration.id, integration);
    }

    /// Number of containers ever created for a release
    pub fn containers_for_release(&self, release_id: u64) -> usize {
        self.read()
            .containers
            .values()
            .filter(|c| c.release_id == release_id)
            .count()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StoreData> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, StoreData> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_release(&self, release: NewRelease) -> Result<Release, ReleaseError> {
        let mut data = self.write();

        if data.releases.values().any(|r| r.key() == release.key) {
            return Err(ReleaseError::Conflict(format!("release {} already exists", release.key)));
        }
        if data
            .releases
            .values()
            .any(|r| r.webhook_token == release.webhook_token)
        {
            return Err(ReleaseError::Conflict("webhook token already issued".to_string()));
        }

        let id = data.next_id();
        let record = Release {
            id,
            project_id: release.project_id,
            cluster_id: release.key.cluster_id,
            namespace: release.key.namespace,
            name: release.key.name,
            webhook_token: release.webhook_token,
            image_repo_uri: release.image_repo_uri,
            git_action_config: None,
            notification_config: None,
            event_container: None,
        };
        data.releases.insert(id, record.clone());
        Ok(record)
    }

    async fn read_release(&self, key: &ReleaseKey) -> Result<Option<Release>, ReleaseError> {
        Ok(self.read().releases.values().find(|r| &r.key() == key).cloned())
    }

    async fn read_release_by_webhook_token(
        &self,
        token: &str,
    ) -> Result<Option<Release>, ReleaseError> {
        Ok(self
            .read()
            .releases
            .values()
            .find(|r| r.webhook_token == token)
            .cloned())
    }

    async fn list_releases_by_image_repo_uri(
        &self,
        cluster_id: u64,
        image_repo_uri: &str,
    ) -> Result<Vec<Release>, ReleaseError> {
        Ok(self
            .read()
            .releases
            .values()
            .filter(|r| r.cluster_id == cluster_id && r.image_repo_uri == image_repo_uri)
            .cloned()
            .collect())
    }

    async fn update_image_repo_uri(
        &self,
        release_id: u64,
        image_repo_uri: &str,
    ) -> Result<Release, ReleaseError> {
        let mut data = self.write();
        let release = data.release_mut(release_id)?;
        release.image_repo_uri = image_repo_uri.to_string();
        Ok(release.clone())
    }

    async fn set_git_action_config(
        &self,
        release_id: u64,
        config: Option<GitActionConfig>,
    ) -> Result<Release, ReleaseError> {
        let mut data = self.write();
        let release = data.release_mut(release_id)?;
        release.git_action_config = config;
        Ok(release.clone())
    }

    async fn set_notification_config(
        &self,
        release_id: u64,
        config_id: Option<u64>,
    ) -> Result<Release, ReleaseError> {
        let mut data = self.write();
        if let Some(id) = config_id {
            if !data.notification_configs.contains_key(&id) {
                return Err(ReleaseError::NotFound(format!("notification config {}", id)));
            }
        }
        let release = data.release_mut(release_id)?;
        release.notification_config = config_id;
        Ok(release.clone())
    }

    async fn create_event_container(&self, release_id: u64) -> Result<EventContainer, ReleaseError> {
        let mut data = self.write();
        if !data.releases.contains_key(&release_id) {
            return Err(ReleaseError::NotFound(format!("release {}", release_id)));
        }

        let id = data.next_id();
        let container = EventContainer { id, release_id };
        data.containers.insert(id, container.clone());
        Ok(container)
    }

    async fn link_event_container(
        &self,
        release_id: u64,
        container_id: u64,
    ) -> Result<u64, ReleaseError> {
        let mut data = self.write();
        let release = data.release_mut(release_id)?;
        match release.event_container {
            Some(existing) => Ok(existing),
            None => {
                release.event_container = Some(container_id);
                Ok(container_id)
            }
        }
    }

    async fn read_event_container(&self, id: u64) -> Result<Option<EventContainer>, ReleaseError> {
        Ok(self.read().containers.get(&id).cloned())
    }

    async fn append_event(
        &self,
        container_id: u64,
        step: NewStep,
    ) -> Result<SubEvent, ReleaseError> {
        let mut data = self.write();
        if !data.containers.contains_key(&container_id) {
            return Err(ReleaseError::NotFound(format!("event container {}", container_id)));
        }

        let id = data.next_id();
        let event = SubEvent {
            id,
            event_container_id: container_id,
            event_id: step.event_id,
            name: step.name,
            index: step.index,
            status: step.status,
            info: step.info,
            time: chrono::Utc::now().timestamp(),
        };
        data.events.push(event.clone());
        Ok(event)
    }

    async fn read_events_by_container_id(
        &self,
        container_id: u64,
    ) -> Result<Vec<SubEvent>, ReleaseError> {
        Ok(self
            .read()
            .events
            .iter()
            .filter(|e| e.event_container_id == container_id)
            .cloned()
            .collect())
    }

    async fn create_notification_config(
        &self,
        enabled: bool,
        success: bool,
        failure: bool,
    ) -> Result<NotificationConfig, ReleaseError> {
        let mut data = self.write();
        let id = data.next_id();
        let config = NotificationConfig {
            id,
            enabled,
            success,
            failure,
        };
        data.notification_configs.insert(id, config);
        Ok(config)
    }

    async fn read_notification_config(
        &self,
        id: u64,
    ) -> Result<Option<NotificationConfig>, ReleaseError> {
        Ok(self.read().notification_configs.get(&id).copied())
    }

    async fn list_slack_integrations(
        &self,
        project_id: u64,
    ) -> Result<Vec<SlackIntegration>, ReleaseError> {
        Ok(self
            .read()
            .slack_integrations
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn read_cluster(&self, id: u64) -> Result<Option<Cluster>, ReleaseError> {
        Ok(self.read().clusters.get(&id).cloned())
    }
}
