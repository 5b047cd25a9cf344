//! Settings file management

use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;
use tracing::info;

use crate::deploy::DEFAULT_PLACEHOLDER_IMAGES;
use crate::errors::ReleaseError;
use crate::filesys::file::File;
use crate::logs::LogLevel;
use crate::models::release::Cluster;

pub const DEFAULT_SETTINGS_PATH: &str = "/etc/release-api/settings.json";

/// Service settings
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// Also write daily rolling log files to this directory
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Listen address
    #[serde(default)]
    pub server: ServerSettings,

    /// Public dashboard URL used in notification links
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Helm gateway configuration
    #[serde(default)]
    pub helm_gateway: GatewaySettings,

    /// CI bridge configuration
    #[serde(default)]
    pub ci: CiSettings,

    /// Helm repositories searched for chart URLs, in priority order
    #[serde(default = "default_chart_repos")]
    pub chart_repos: Vec<String>,

    /// Starter app images replaced by the CI image on webhook deploys
    #[serde(default = "default_placeholder_images")]
    pub placeholder_images: Vec<String>,

    /// Records loaded into the store at startup
    #[serde(default)]
    pub seed: SeedSettings,

    /// Store snapshot file, loaded at startup and written on shutdown
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_chart_repos() -> Vec<String> {
    vec![
        "https://charts.getporter.dev".to_string(),
        "https://chart-addons.getporter.dev".to_string(),
    ]
}

fn default_placeholder_images() -> Vec<String> {
    DEFAULT_PLACEHOLDER_IMAGES.iter().map(|s| s.to_string()).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            server_url: default_server_url(),
            helm_gateway: GatewaySettings::default(),
            ci: CiSettings::default(),
            chart_repos: default_chart_repos(),
            placeholder_images: default_placeholder_images(),
            seed: SeedSettings::default(),
            snapshot_path: None,
        }
    }
}

impl Settings {
    /// Read the settings file; a missing file yields the defaults
    pub async fn load(file: &File) -> Result<Self, ReleaseError> {
        if !file.exists().await {
            info!("No settings file at {}, using defaults", file.path().display());
            return Ok(Self::default());
        }
        file.read_json().await
    }
}

/// Listen address settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Helm gateway settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    #[serde(default = "default_gateway_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gateway_url() -> String {
    "http://localhost:8090".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// CI bridge settings
#[derive(Debug, Deserialize)]
pub struct CiSettings {
    #[serde(default = "default_ci_url")]
    pub base_url: String,

    /// Bearer token for the bridge
    #[serde(default)]
    pub token: Option<SecretString>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Workflow versions that get the build env secret
    #[serde(default = "default_secret_constraint")]
    pub secret_constraint: String,
}

fn default_ci_url() -> String {
    "http://localhost:8091".to_string()
}

fn default_secret_constraint() -> String {
    crate::ci::BUILD_ENV_SECRET_CONSTRAINT.to_string()
}

impl Default for CiSettings {
    fn default() -> Self {
        Self {
            base_url: default_ci_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
            secret_constraint: default_secret_constraint(),
        }
    }
}

/// Startup records
#[derive(Debug, Default, Deserialize)]
pub struct SeedSettings {
    #[serde(default)]
    pub clusters: Vec<Cluster>,

    #[serde(default)]
    pub slack_integrations: Vec<SeedSlackIntegration>,
}

/// A Slack integration as written in the settings file
#[derive(Debug, Deserialize)]
pub struct SeedSlackIntegration {
    pub id: u64,
    pub project_id: u64,
    pub webhook_url: SecretString,
    #[serde(default)]
    pub channel: Option<String>,
}
