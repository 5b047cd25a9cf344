//! Release step log
//!
//! Each release owns at most one event container, created the first time a
//! step is reported. Steps are appended, never rewritten; readers order them
//! by `index` and group them by `event_id` themselves.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::errors::ReleaseError;
use crate::models::event::{EventContainer, NewStep, SubEvent};
use crate::models::release::{Release, ReleaseKey};
use crate::storage::store::Store;

/// Step log over a [`Store`]
pub struct EventLog {
    store: Arc<dyn Store>,
    /// One lock per release, held while its container is created and linked
    container_locks: Mutex<HashMap<u64, Arc<tokio::sync::Mutex<()>>>>,
}

impl EventLog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            container_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Return the release's container, creating and linking it exactly once
    pub async fn ensure_container(&self, release: &Release) -> Result<EventContainer, ReleaseError> {
        if let Some(id) = release.event_container {
            return self.read_container(id).await;
        }

        let lock = self.container_lock(release.id);
        let result = {
            let _guard = lock.lock().await;
            self.create_and_link(release).await
        };
        self.release_lock(release.id, &lock);
        result
    }

    async fn create_and_link(&self, release: &Release) -> Result<EventContainer, ReleaseError> {
        // Another request may have linked a container while we waited.
        let current = self
            .store
            .read_release(&release.key())
            .await?
            .ok_or_else(|| ReleaseError::NotFound(format!("release {}", release.key())))?;

        if let Some(id) = current.event_container {
            return self.read_container(id).await;
        }

        let container = self.store.create_event_container(current.id).await?;
        let linked = self.store.link_event_container(current.id, container.id).await?;
        if linked != container.id {
            debug!(
                "Release {} was linked to container {} concurrently, dropping {}",
                current.key(),
                linked,
                container.id
            );
            return self.read_container(linked).await;
        }

        info!("Created event container {} for release {}", container.id, current.key());
        Ok(container)
    }

    /// Append a step to the release's log
    pub async fn append_step(
        &self,
        key: &ReleaseKey,
        step: NewStep,
    ) -> Result<SubEvent, ReleaseError> {
        let release = self.resolve(key).await?;
        let container = self.ensure_container(&release).await?;

        debug!(
            "Appending step {} ({}) with status {} to release {}",
            step.event_id, step.index, step.status, key
        );
        self.store.append_event(container.id, step).await
    }

    /// All steps of the release in append order; empty if none were reported
    pub async fn list_steps(&self, key: &ReleaseKey) -> Result<Vec<SubEvent>, ReleaseError> {
        let release = self.resolve(key).await?;

        match release.event_container {
            Some(id) => self.store.read_events_by_container_id(id).await,
            None => Ok(Vec::new()),
        }
    }

    async fn resolve(&self, key: &ReleaseKey) -> Result<Release, ReleaseError> {
        self.store
            .read_release(key)
            .await?
            .ok_or_else(|| ReleaseError::NotFound(format!("release {}", key)))
    }

    async fn read_container(&self, id: u64) -> Result<EventContainer, ReleaseError> {
        self.store
            .read_event_container(id)
            .await?
            .ok_or_else(|| ReleaseError::StorageError(format!("event container {} is missing", id)))
    }

    fn container_lock(&self, release_id: u64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.container_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(release_id).or_default().clone()
    }

    /// Drop the release's lock once the link is settled.
    ///
    /// Late waiters still hold their clone and re-read the linked release, so
    /// a fresh lock handed out afterwards never creates a second container.
    fn release_lock(&self, release_id: u64, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.container_locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks.get(&release_id).is_some_and(|held| Arc::ptr_eq(held, lock)) {
            locks.remove(&release_id);
        }
    }
}
