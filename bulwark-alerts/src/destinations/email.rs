//! SMTP email destination

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::alert::Alert;
use crate::dispatcher::AlertSink;
use crate::errors::AlertError;

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Plain connection; only for local relays
    None,
    /// Upgrade with STARTTLS (usually port 587)
    #[default]
    Starttls,
    /// TLS from the first byte (usually port 465)
    Tls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub security: SmtpSecurity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Sender address, e.g. `Bulwark <alerts@example.com>`
    pub from: String,
    pub to: Vec<String>,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_subject_prefix() -> String {
    "[Bulwark Alert]".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

impl EmailConfig {
    pub fn new(smtp_host: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            smtp_host: smtp_host.into(),
            smtp_port: default_smtp_port(),
            security: SmtpSecurity::default(),
            username: None,
            password: None,
            from: from.into(),
            to: vec![to.into()],
            subject_prefix: default_subject_prefix(),
            timeout: default_timeout(),
        }
    }
}

/// Mails alerts to a fixed list of recipients
pub struct EmailAlertSink {
    config: EmailConfig,
    from: Mailbox,
    to: Vec<Mailbox>,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailAlertSink {
    pub fn from_config(config: EmailConfig) -> Result<Self, AlertError> {
        if config.smtp_host.is_empty() {
            return Err(AlertError::Configuration("email smtp_host is required".to_string()));
        }
        if config.to.is_empty() {
            return Err(AlertError::Configuration(
                "email needs at least one recipient".to_string(),
            ));
        }

        let from = parse_mailbox(&config.from)?;
        let to = config
            .to
            .iter()
            .map(|address| parse_mailbox(address))
            .collect::<Result<Vec<_>, _>>()?;

        let builder = match config.security {
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.smtp_host.as_str())
            }
            SmtpSecurity::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                    .map_err(|e| AlertError::Configuration(format!("invalid SMTP relay: {}", e)))?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| AlertError::Configuration(format!("invalid SMTP relay: {}", e)))?,
        };
        let mut builder = builder
            .port(config.smtp_port)
            .timeout(Some(config.timeout));
        if let Some(username) = &config.username {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            ));
        }

        Ok(Self {
            from,
            to,
            transport: builder.build(),
            config,
        })
    }

    fn message(&self, alert: &Alert) -> Result<Message, AlertError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(format!("{} {}", self.config.subject_prefix, alert.subject))
            .header(ContentType::TEXT_PLAIN);
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        builder
            .body(alert.formatted_body())
            .map_err(|e| AlertError::Configuration(format!("failed to build email: {}", e)))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, AlertError> {
    address
        .parse()
        .map_err(|e| AlertError::Configuration(format!("invalid email address '{}': {}", address, e)))
}

impl fmt::Debug for EmailAlertSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailAlertSink")
            .field("smtp_host", &self.config.smtp_host)
            .field("smtp_port", &self.config.smtp_port)
            .field("to", &self.config.to)
            .finish()
    }
}

#[async_trait]
impl AlertSink for EmailAlertSink {
    fn name(&self) -> &str {
        "email"
    }

    async fn notify(&self, alert: &Alert) -> Result<(), AlertError> {
        let message = self.message(alert)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| AlertError::Network {
                destination: "email".to_string(),
                error: e.to_string(),
            })?;
        tracing::info!(subject = %alert.subject, recipients = self.to.len(), "email alert sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertSeverity;

    #[test]
    fn test_invalid_addresses_rejected() {
        let err = EmailAlertSink::from_config(EmailConfig::new(
            "smtp.example.com",
            "not an address",
            "ops@example.com",
        ))
        .unwrap_err();
        assert!(err.to_string().contains("not an address"));

        let mut config = EmailConfig::new("smtp.example.com", "alerts@example.com", "ops@example.com");
        config.to.clear();
        assert!(matches!(
            EmailAlertSink::from_config(config),
            Err(AlertError::Configuration(_))
        ));
    }

    #[test]
    fn test_message_headers() {
        let mut config = EmailConfig::new(
            "smtp.example.com",
            "Bulwark <alerts@example.com>",
            "ops@example.com",
        );
        config.to.push("oncall@example.com".to_string());
        let sink = EmailAlertSink::from_config(config).unwrap();

        let alert = Alert::new("LLM - Max Retries Exceeded", "three attempts", AlertSeverity::Critical);
        let formatted = String::from_utf8(sink.message(&alert).unwrap().formatted()).unwrap();
        assert!(formatted.contains("Subject: [Bulwark Alert] LLM - Max Retries Exceeded"));
        assert!(formatted.contains("ops@example.com"));
        assert!(formatted.contains("oncall@example.com"));
        assert!(formatted.contains("three attempts"));
    }

    #[test]
    fn test_config_defaults() {
        let config: EmailConfig = serde_json::from_value(serde_json::json!({
            "smtp_host": "smtp.example.com",
            "from": "alerts@example.com",
            "to": ["ops@example.com"]
        }))
        .unwrap();
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.security, SmtpSecurity::Starttls);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.subject_prefix, "[Bulwark Alert]");
    }
}
