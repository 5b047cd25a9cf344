//! Slack incoming webhook channel

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

use crate::errors::ReleaseError;
use crate::models::release::SlackIntegration;
use crate::notify::NotificationChannel;

#[derive(Serialize)]
struct SlackMessage<'a> {
    text: &'a str,
}

/// Posts messages to one Slack incoming webhook
pub struct SlackChannel {
    client: Client,
    webhook_url: SecretString,
    label: String,
}

impl SlackChannel {
    pub fn new(client: Client, integration: &SlackIntegration) -> Self {
        let label = match &integration.channel {
            Some(channel) => format!("slack:{}", channel),
            None => format!("slack:{}", integration.id),
        };

        Self {
            client,
            webhook_url: SecretString::from(integration.webhook_url.clone()),
            label,
        }
    }
}

#[async_trait]
impl NotificationChannel for SlackChannel {
    fn label(&self) -> &str {
        &self.label
    }

    async fn send(&self, text: &str) -> Result<(), ReleaseError> {
        debug!("Sending Slack message to {}", self.label);

        self.client
            .post(self.webhook_url.expose_secret())
            .json(&SlackMessage { text })
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
