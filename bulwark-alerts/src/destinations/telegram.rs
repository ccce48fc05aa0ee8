//! Telegram bot destination

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::alert::Alert;
use crate::dispatcher::AlertSink;
use crate::errors::AlertError;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    TELEGRAM_API_BASE.to_string()
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            api_base: default_api_base(),
        }
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
}

/// Sends alerts as chat messages through the Bot API's `sendMessage`
#[derive(Debug)]
pub struct TelegramAlertSink {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramAlertSink {
    pub fn new(config: TelegramConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn from_config(config: TelegramConfig) -> Result<Self, AlertError> {
        if config.bot_token.is_empty() || config.chat_id.is_empty() {
            return Err(AlertError::Configuration(
                "telegram bot token and chat id are required".to_string(),
            ));
        }
        let client = super::create_default_client()
            .map_err(|e| AlertError::Configuration(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::new(config, client))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        )
    }

    fn render(alert: &Alert) -> String {
        format!("\u{1F6A8} {}\n\n{}", alert.subject, alert.formatted_body())
    }
}

#[async_trait]
impl AlertSink for TelegramAlertSink {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, alert: &Alert) -> Result<(), AlertError> {
        let body = SendMessage {
            chat_id: &self.config.chat_id,
            text: Self::render(alert),
        };

        // The token is part of the URL; keep it out of error messages.
        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| AlertError::Network {
                destination: "telegram".to_string(),
                error: e.without_url().to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(AlertError::Rejected {
            destination: "telegram".to_string(),
            status: status.as_u16(),
            response: response.text().await.unwrap_or_default(),
        })
    }
}
