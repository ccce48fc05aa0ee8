//! Generic JSON webhook destination

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::alert::Alert;
use crate::dispatcher::AlertSink;
use crate::errors::AlertError;

/// Configuration for webhook destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    /// Optional bearer token sent in the Authorization header
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bearer_token: None,
            timeout: default_timeout(),
        }
    }
}

/// POSTs each alert as a JSON document
#[derive(Debug)]
pub struct WebhookAlertSink {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookAlertSink {
    pub fn new(config: WebhookConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn from_config(config: WebhookConfig) -> Result<Self, AlertError> {
        let client = super::create_default_client()
            .map_err(|e| AlertError::Configuration(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::new(config, client))
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, alert: &Alert) -> Result<(), AlertError> {
        let mut request = self
            .client
            .post(&self.config.url)
            .timeout(self.config.timeout)
            .json(alert);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| AlertError::Network {
            destination: self.config.url.clone(),
            error: e.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(url = %self.config.url, subject = %alert.subject, "alert delivered to webhook");
            return Ok(());
        }

        Err(AlertError::Rejected {
            destination: self.config.url.clone(),
            status: status.as_u16(),
            response: response.text().await.unwrap_or_default(),
        })
    }
}
