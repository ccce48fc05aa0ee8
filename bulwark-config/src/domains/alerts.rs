//! Alert destination configuration

use bulwark_alerts::{AlertSeverity, EmailConfig, TelegramConfig, WebhookConfig};
use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, validate_url, Validatable};

/// Which destinations receive alerts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Alerts below this severity are dropped
    pub min_severity: AlertSeverity,

    /// Write alerts to the application log
    pub log: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailConfig>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            min_severity: AlertSeverity::Info,
            log: true,
            webhook: None,
            telegram: None,
            email: None,
        }
    }
}

impl Validatable for AlertsConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(webhook) = &self.webhook {
            validate_url(&webhook.url, "webhook.url", self.domain_name())?;
            if webhook.timeout.is_zero() {
                return Err(self.validation_error("webhook.timeout must be greater than 0"));
            }
        }

        if let Some(telegram) = &self.telegram {
            validate_required_string(&telegram.bot_token, "telegram.bot_token", self.domain_name())?;
            validate_required_string(&telegram.chat_id, "telegram.chat_id", self.domain_name())?;
            validate_url(&telegram.api_base, "telegram.api_base", self.domain_name())?;
        }

        if let Some(email) = &self.email {
            validate_required_string(&email.smtp_host, "email.smtp_host", self.domain_name())?;
            validate_required_string(&email.from, "email.from", self.domain_name())?;
            if email.smtp_port == 0 {
                return Err(self.validation_error("email.smtp_port must be greater than 0"));
            }
            if email.to.is_empty() || email.to.iter().any(|address| address.trim().is_empty()) {
                return Err(self.validation_error("email.to needs at least one non-empty address"));
            }
            if email.timeout.is_zero() {
                return Err(self.validation_error("email.timeout must be greater than 0"));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "alerts"
    }
}
