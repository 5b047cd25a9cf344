//! Deploy notifications
//!
//! A [`Notifier`] is assembled per deploy attempt from the project's chat
//! integrations and the release's optional notification config. Dispatch is
//! best-effort: every channel is attempted, failures are logged and returned
//! to the caller, and nothing here fails a deploy.

pub mod message;
pub mod slack;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::errors::ReleaseError;
use crate::models::release::{NotificationConfig, SlackIntegration};
use crate::notify::message::DeployNotification;
use crate::notify::slack::SlackChannel;

/// A destination for rendered deploy messages
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Short name used in logs and error reports
    fn label(&self) -> &str;

    async fn send(&self, text: &str) -> Result<(), ReleaseError>;
}

/// Builds channels from stored integrations
pub trait ChannelFactory: Send + Sync {
    fn channels(&self, integrations: &[SlackIntegration]) -> Vec<Arc<dyn NotificationChannel>>;
}

/// Builds a [`SlackChannel`] per integration over a shared HTTP client
pub struct SlackChannelFactory {
    client: reqwest::Client,
}

impl SlackChannelFactory {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ChannelFactory for SlackChannelFactory {
    fn channels(&self, integrations: &[SlackIntegration]) -> Vec<Arc<dyn NotificationChannel>> {
        integrations
            .iter()
            .map(|i| Arc::new(SlackChannel::new(self.client.clone(), i)) as Arc<dyn NotificationChannel>)
            .collect()
    }
}

/// Channels and gating for one deploy attempt
pub struct Notifier {
    config: Option<NotificationConfig>,
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl Notifier {
    pub fn new(config: Option<NotificationConfig>, channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self { config, channels }
    }

    /// Whether the release's config lets this outcome through.
    /// Without a config every outcome is sent.
    pub fn should_send(&self, notification: &DeployNotification) -> bool {
        match &self.config {
            None => true,
            Some(config) if !config.enabled => false,
            Some(config) if notification.is_failure() => config.failure,
            Some(config) => config.success,
        }
    }

    /// Send to every channel; returns one error string per failed channel
    pub async fn notify(&self, notification: &DeployNotification) -> Vec<String> {
        if self.channels.is_empty() {
            debug!("No notification channels for {}", notification.name);
            return Vec::new();
        }
        if !self.should_send(notification) {
            debug!(
                "Notification config suppresses status {} for {}",
                notification.status.as_str(),
                notification.name
            );
            return Vec::new();
        }

        let text = notification.render();
        let sends = self.channels.iter().map(|channel| {
            let text = text.as_str();
            async move { (channel.label().to_string(), channel.send(text).await) }
        });

        let mut failures = Vec::new();
        for (label, result) in join_all(sends).await {
            match result {
                Ok(()) => info!("Notified {} about {}", label, notification.name),
                Err(e) => {
                    warn!("Failed to notify {} about {}: {}", label, notification.name, e);
                    failures.push(format!("notification to {} failed: {}", label, e));
                }
            }
        }

        failures
    }
}
