//! In-process stand-ins for the deployment engine, CI provider and chat

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use release_api::cache::chart_urls::{ChartIndex, ChartUrlCache};
use release_api::ci::{BuildSecret, CiProvider};
use release_api::deploy::{Deployer, DeployerOptions};
use release_api::engine::{ChartRef, DeploymentEngine};
use release_api::errors::ReleaseError;
use release_api::events::log::EventLog;
use release_api::models::deployment::{DeployedRelease, ReleaseStatus};
use release_api::models::release::{
    Cluster, GitActionConfig, NewRelease, Release, ReleaseKey, SlackIntegration,
};
use release_api::models::values::ReleaseValues;
use release_api::notify::{ChannelFactory, NotificationChannel};
use release_api::storage::memory::MemoryStore;
use release_api::storage::store::Store;

pub const PROJECT_ID: u64 = 1;
pub const CLUSTER_ID: u64 = 10;
pub const NAMESPACE: &str = "default";

pub fn values(json: Value) -> ReleaseValues {
    match json {
        Value::Object(map) => ReleaseValues::new(map),
        other => panic!("values must be an object, got {}", other),
    }
}

// ================================== ENGINE ====================================== //

#[derive(Default)]
pub struct FakeEngine {
    releases: Mutex<HashMap<String, DeployedRelease>>,
    /// Every revision of each release, oldest first
    history: Mutex<HashMap<String, Vec<DeployedRelease>>>,
    failing_fetch: Mutex<HashSet<String>>,
    upgrade_error: Mutex<Option<String>>,
    pub upgrades: Mutex<Vec<(ReleaseKey, ReleaseValues, Option<ChartRef>)>>,
    pub rollbacks: Mutex<Vec<(ReleaseKey, u32)>>,
}

impl FakeEngine {
    pub fn install(&self, name: &str, chart: &str, config: ReleaseValues) {
        let release = DeployedRelease {
            name: name.to_string(),
            namespace: NAMESPACE.to_string(),
            chart_name: chart.to_string(),
            chart_version: "0.50.0".to_string(),
            version: 1,
            status: ReleaseStatus::Deployed,
            config,
        };
        self.history
            .lock()
            .unwrap()
            .insert(name.to_string(), vec![release.clone()]);
        self.releases.lock().unwrap().insert(name.to_string(), release);
    }

    pub fn fail_fetch(&self, name: &str) {
        self.failing_fetch.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_upgrades(&self, message: &str) {
        *self.upgrade_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn upgrade_count(&self) -> usize {
        self.upgrades.lock().unwrap().len()
    }

    fn record(&self, release: &DeployedRelease) {
        self.history
            .lock()
            .unwrap()
            .entry(release.name.clone())
            .or_default()
            .push(release.clone());
    }

    /// A past revision, superseded unless it is the latest
    fn revision(&self, name: &str, revision: u32) -> Result<DeployedRelease, ReleaseError> {
        let history = self.history.lock().unwrap();
        let revisions = history
            .get(name)
            .ok_or_else(|| ReleaseError::NotFound(format!("helm release {}", name)))?;
        let latest = revisions.last().map(|r| r.version);
        let mut found = revisions
            .iter()
            .find(|r| r.version == revision)
            .cloned()
            .ok_or_else(|| ReleaseError::NotFound(format!("revision {} of {}", revision, name)))?;
        if Some(revision) != latest {
            found.status = ReleaseStatus::Superseded;
        }
        Ok(found)
    }

    pub fn last_upgrade(&self) -> (ReleaseKey, ReleaseValues, Option<ChartRef>) {
        self.upgrades.lock().unwrap().last().cloned().expect("no upgrade recorded")
    }
}

#[async_trait]
impl DeploymentEngine for FakeEngine {
    async fn get_release(
        &self,
        target: &ReleaseKey,
        revision: Option<u32>,
    ) -> Result<DeployedRelease, ReleaseError> {
        if self.failing_fetch.lock().unwrap().contains(&target.name) {
            return Err(ReleaseError::EngineError(format!("cannot reach {}", target.name)));
        }
        if let Some(revision) = revision {
            return self.revision(&target.name, revision);
        }
        self.releases
            .lock()
            .unwrap()
            .get(&target.name)
            .cloned()
            .ok_or_else(|| ReleaseError::NotFound(format!("helm release {}", target.name)))
    }

    async fn upgrade(
        &self,
        target: &ReleaseKey,
        values: &ReleaseValues,
        chart: Option<&ChartRef>,
    ) -> Result<DeployedRelease, ReleaseError> {
        self.upgrades
            .lock()
            .unwrap()
            .push((target.clone(), values.clone(), chart.cloned()));

        if let Some(message) = self.upgrade_error.lock().unwrap().clone() {
            return Err(ReleaseError::EngineError(message));
        }

        let mut releases = self.releases.lock().unwrap();
        let release = releases
            .get_mut(&target.name)
            .ok_or_else(|| ReleaseError::NotFound(format!("helm release {}", target.name)))?;
        release.version += 1;
        release.status = ReleaseStatus::Deployed;
        release.config = values.clone();
        self.record(release);
        Ok(release.clone())
    }

    async fn rollback(&self, target: &ReleaseKey, revision: u32) -> Result<(), ReleaseError> {
        self.rollbacks.lock().unwrap().push((target.clone(), revision));
        let restored = self.revision(&target.name, revision)?;

        let mut releases = self.releases.lock().unwrap();
        let release = releases
            .get_mut(&target.name)
            .ok_or_else(|| ReleaseError::NotFound(format!("helm release {}", target.name)))?;
        release.version += 1;
        release.status = ReleaseStatus::Deployed;
        release.config = restored.config;
        self.record(release);
        Ok(())
    }
}

// ==================================== CI ======================================== //

#[derive(Default)]
pub struct FakeCi {
    pub pushes: Mutex<Vec<BuildSecret>>,
}

impl FakeCi {
    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }
}

#[async_trait]
impl CiProvider for FakeCi {
    async fn push_build_secret(&self, secret: &BuildSecret) -> Result<(), ReleaseError> {
        self.pushes.lock().unwrap().push(secret.clone());
        Ok(())
    }
}

// =================================== CHAT ======================================= //

struct RecordingChannel {
    label: String,
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn label(&self) -> &str {
        &self.label
    }

    async fn send(&self, text: &str) -> Result<(), ReleaseError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Every integration becomes a channel writing into one shared outbox
#[derive(Default)]
pub struct RecordingChannels {
    pub sent: Arc<Mutex<Vec<String>>>,
}

impl ChannelFactory for RecordingChannels {
    fn channels(&self, integrations: &[SlackIntegration]) -> Vec<Arc<dyn NotificationChannel>> {
        integrations
            .iter()
            .map(|i| {
                Arc::new(RecordingChannel {
                    label: format!("recording:{}", i.id),
                    sent: self.sent.clone(),
                }) as Arc<dyn NotificationChannel>
            })
            .collect()
    }
}

// ================================ CHART INDEX =================================== //

pub struct StaticIndex(pub Vec<(&'static str, &'static str)>);

#[async_trait]
impl ChartIndex for StaticIndex {
    async fn fetch(&self) -> Result<HashMap<String, String>, ReleaseError> {
        Ok(self
            .0
            .iter()
            .map(|(name, url)| (name.to_string(), url.to_string()))
            .collect())
    }
}

// ================================== HARNESS ===================================== //

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub engine: Arc<FakeEngine>,
    pub ci: Arc<FakeCi>,
    pub channels: Arc<RecordingChannels>,
    pub event_log: Arc<EventLog>,
    pub deployer: Arc<Deployer>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        store.add_cluster(Cluster {
            id: CLUSTER_ID,
            project_id: PROJECT_ID,
            name: "prod".to_string(),
        });
        store.add_slack_integration(SlackIntegration {
            id: 100,
            project_id: PROJECT_ID,
            webhook_url: "https://hooks.slack.com/services/test".to_string(),
            channel: Some("deploys".to_string()),
        });

        let engine = Arc::new(FakeEngine::default());
        let ci = Arc::new(FakeCi::default());
        let channels = Arc::new(RecordingChannels::default());
        let charts = Arc::new(ChartUrlCache::new(Box::new(StaticIndex(vec![
            ("web", "https://charts.example.com"),
            ("job", "https://charts.example.com"),
        ]))));

        let event_log = Arc::new(EventLog::new(store.clone()));
        let deployer = Arc::new(Deployer::new(
            store.clone(),
            engine.clone(),
            ci.clone(),
            channels.clone(),
            charts,
            DeployerOptions {
                server_url: "https://dashboard.example.com".to_string(),
                ..Default::default()
            },
        ));

        Self {
            store,
            engine,
            ci,
            channels,
            event_log,
            deployer,
        }
    }

    pub fn key(name: &str) -> ReleaseKey {
        ReleaseKey::new(CLUSTER_ID, NAMESPACE, name)
    }

    /// Install a release in the fake engine and register it in the store
    pub async fn release(&self, name: &str, chart: &str, config: Value) -> Release {
        let config = values(config);
        let image_repo_uri = config.image_repository().unwrap_or_default();
        self.engine.install(name, chart, config);

        self.store
            .create_release(NewRelease {
                project_id: PROJECT_ID,
                key: Self::key(name),
                webhook_token: format!("token-{}", name),
                image_repo_uri,
            })
            .await
            .unwrap()
    }

    pub async fn link_ci(&self, release: &Release, version: &str) -> Release {
        self.store
            .set_git_action_config(
                release.id,
                Some(GitActionConfig {
                    git_repo: "acme/my-app".to_string(),
                    git_branch: "main".to_string(),
                    image_repo_uri: "acct/my-app".to_string(),
                    dockerfile_path: "./Dockerfile".to_string(),
                    folder_path: ".".to_string(),
                    github_installation_id: 42,
                    version: version.to_string(),
                }),
            )
            .await
            .unwrap()
    }

    pub fn sent(&self) -> Vec<String> {
        self.channels.sent.lock().unwrap().clone()
    }
}
