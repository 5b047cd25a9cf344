//! Persistence interface for release records and step logs

use async_trait::async_trait;

use crate::errors::ReleaseError;
use crate::models::event::{EventContainer, NewStep, SubEvent};
use crate::models::release::{
    Cluster, GitActionConfig, NewRelease, NotificationConfig, Release, ReleaseKey, SlackIntegration,
};

/// Release persistence
///
/// Lookups return `Ok(None)` for absent records; callers decide whether that
/// is an error. Writes against unknown IDs fail with `NotFound`.
#[async_trait]
pub trait Store: Send + Sync {
    // Releases

    /// Create a release. Fails with `Conflict` when the identity or webhook
    /// token is already taken.
    async fn create_release(&self, release: NewRelease) -> Result<Release, ReleaseError>;

    async fn read_release(&self, key: &ReleaseKey) -> Result<Option<Release>, ReleaseError>;

    async fn read_release_by_webhook_token(
        &self,
        token: &str,
    ) -> Result<Option<Release>, ReleaseError>;

    async fn list_releases_by_image_repo_uri(
        &self,
        cluster_id: u64,
        image_repo_uri: &str,
    ) -> Result<Vec<Release>, ReleaseError>;

    async fn update_image_repo_uri(
        &self,
        release_id: u64,
        image_repo_uri: &str,
    ) -> Result<Release, ReleaseError>;

    async fn set_git_action_config(
        &self,
        release_id: u64,
        config: Option<GitActionConfig>,
    ) -> Result<Release, ReleaseError>;

    async fn set_notification_config(
        &self,
        release_id: u64,
        config_id: Option<u64>,
    ) -> Result<Release, ReleaseError>;

    // Step log

    async fn create_event_container(&self, release_id: u64) -> Result<EventContainer, ReleaseError>;

    /// Point the release at `container_id` unless it already references a
    /// container, in which case the existing reference wins and is returned.
    async fn link_event_container(
        &self,
        release_id: u64,
        container_id: u64,
    ) -> Result<u64, ReleaseError>;

    async fn read_event_container(&self, id: u64) -> Result<Option<EventContainer>, ReleaseError>;

    async fn append_event(
        &self,
        container_id: u64,
        step: NewStep,
    ) -> Result<SubEvent, ReleaseError>;

    /// Sub-events of a container in append order
    async fn read_events_by_container_id(
        &self,
        container_id: u64,
    ) -> Result<Vec<SubEvent>, ReleaseError>;

    // Integrations

    async fn create_notification_config(
        &self,
        enabled: bool,
        success: bool,
        failure: bool,
    ) -> Result<NotificationConfig, ReleaseError>;

    async fn read_notification_config(
        &self,
        id: u64,
    ) -> Result<Option<NotificationConfig>, ReleaseError>;

    async fn list_slack_integrations(
        &self,
        project_id: u64,
    ) -> Result<Vec<SlackIntegration>, ReleaseError>;

    async fn read_cluster(&self, id: u64) -> Result<Option<Cluster>, ReleaseError>;
}
