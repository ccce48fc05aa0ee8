//! Configuration loading and environment variable handling

use bulwark_alerts::{EmailConfig, TelegramConfig, WebhookConfig};
use bulwark_logging::LoggingConfig;
use bulwark_resilience::{CircuitBreakerConfig, HealthConfig, RetryPolicy};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::domains::alerts::AlertsConfig;
use crate::domains::services::{ServiceMode, ServicesConfig};
use crate::domains::BulwarkConfig;
use crate::error::{ConfigError, ConfigResult};

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "BULWARK".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<BulwarkConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: BulwarkConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<BulwarkConfig> {
        let mut config = BulwarkConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<BulwarkConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut BulwarkConfig) -> ConfigResult<()> {
        self.apply_retry_overrides(&mut config.retry)?;
        self.apply_breaker_overrides(&mut config.circuit_breaker)?;
        self.apply_health_overrides(&mut config.health)?;
        self.apply_logging_overrides(&mut config.logging)?;
        self.apply_alert_overrides(&mut config.alerts)?;
        self.apply_service_overrides(&mut config.services)?;
        Ok(())
    }

    fn apply_retry_overrides(&self, config: &mut RetryPolicy) -> ConfigResult<()> {
        if let Some(attempts) = self.parse_env_var::<u32>("RETRY_MAX_ATTEMPTS")? {
            config.max_attempts = attempts;
        }
        if let Some(seconds) = self.parse_env_var::<u64>("RETRY_INITIAL_DELAY_SECONDS")? {
            config.initial_delay = Duration::from_secs(seconds);
        }
        if let Some(multiplier) = self.parse_env_var::<f64>("RETRY_BACKOFF_MULTIPLIER")? {
            config.backoff_multiplier = multiplier;
        }
        Ok(())
    }

    fn apply_breaker_overrides(&self, config: &mut CircuitBreakerConfig) -> ConfigResult<()> {
        if let Some(threshold) = self.parse_env_var::<u32>("BREAKER_FAILURE_THRESHOLD")? {
            config.failure_threshold = threshold;
        }
        if let Some(seconds) = self.parse_env_var::<u64>("BREAKER_TIMEOUT_SECONDS")? {
            config.open_timeout = Duration::from_secs(seconds);
        }
        Ok(())
    }

    fn apply_health_overrides(&self, config: &mut HealthConfig) -> ConfigResult<()> {
        if let Some(seconds) = self.parse_env_var::<u64>("HEALTH_INTERVAL_SECONDS")? {
            config.poll_interval = Duration::from_secs(seconds);
        }
        if let Some(seconds) = self.parse_env_var::<u64>("HEALTH_TIMEOUT_SECONDS")? {
            config.probe_timeout = Duration::from_secs(seconds);
        }
        Ok(())
    }

    fn apply_logging_overrides(&self, config: &mut LoggingConfig) -> ConfigResult<()> {
        if let Some(level) = self.get_env_var("LOG_LEVEL") {
            config.level = level;
        }
        if let Some(format) = self.parse_env_var("LOG_FORMAT")? {
            config.format = format;
        }
        if let Some(path) = self.get_env_var("EVENT_LOG_PATH") {
            config.event_log = Some(PathBuf::from(path));
        }
        Ok(())
    }

    fn apply_alert_overrides(&self, config: &mut AlertsConfig) -> ConfigResult<()> {
        if let Some(url) = self.get_env_var("WEBHOOK_URL") {
            match config.webhook.as_mut() {
                Some(webhook) => webhook.url = url,
                None => config.webhook = Some(WebhookConfig::new(url)),
            }
        }

        // A half-configured bot is caught by validation.
        if let Some(token) = self.get_env_var("TELEGRAM_BOT_TOKEN") {
            config
                .telegram
                .get_or_insert_with(|| TelegramConfig::new("", ""))
                .bot_token = token;
        }
        if let Some(chat_id) = self.get_env_var("TELEGRAM_CHAT_ID") {
            config
                .telegram
                .get_or_insert_with(|| TelegramConfig::new("", ""))
                .chat_id = chat_id;
        }

        // Email is enabled by BULWARK_SMTP_HOST; the rest refine it.
        if let Some(host) = self.get_env_var("SMTP_HOST") {
            match config.email.as_mut() {
                Some(email) => email.smtp_host = host,
                None => {
                    config.email = Some(EmailConfig {
                        to: Vec::new(),
                        ..EmailConfig::new(host, "", "")
                    })
                }
            }
        }
        if let Some(email) = config.email.as_mut() {
            if let Some(port) = self.parse_env_var::<u16>("SMTP_PORT")? {
                email.smtp_port = port;
            }
            if let Some(username) = self.get_env_var("SMTP_USERNAME") {
                email.username = Some(username);
            }
            if let Some(password) = self.get_env_var("SMTP_PASSWORD") {
                email.password = Some(password);
            }
            if let Some(from) = self.get_env_var("ALERT_EMAIL_FROM") {
                email.from = from;
            }
            if let Some(to) = self.get_env_var("ALERT_EMAIL_TO") {
                email.to = to
                    .split(',')
                    .map(str::trim)
                    .filter(|address| !address.is_empty())
                    .map(String::from)
                    .collect();
            }
        }
        Ok(())
    }

    fn apply_service_overrides(&self, config: &mut ServicesConfig) -> ConfigResult<()> {
        if let Some(mode) = self.parse_env_var::<ServiceMode>("SERVICE_MODE")? {
            config.mode = mode;
        }
        if let Some(key) = self.get_env_var("SPEECH_API_KEY") {
            config.speech.api_key = Some(key);
        }
        if let Some(key) = self.get_env_var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        Ok(())
    }

    /// Get a non-empty environment variable with prefix
    fn get_env_var(&self, name: &str) -> Option<String> {
        std::env::var(format!("{}_{}", self.prefix, name))
            .ok()
            .filter(|value| !value.is_empty())
    }

    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_env_var(name) {
            Some(raw) => raw.parse().map(Some).map_err(|e| {
                ConfigError::EnvError(format!("Invalid {}_{}: {}", self.prefix, name, e))
            }),
            None => Ok(None),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
