//! Concrete alert destinations

pub mod email;
pub mod log;
pub mod telegram;
pub mod webhook;

pub use email::{EmailAlertSink, EmailConfig, SmtpSecurity};
pub use self::log::LogAlertSink;
pub use telegram::{TelegramAlertSink, TelegramConfig};
pub use webhook::{WebhookAlertSink, WebhookConfig};

use std::time::Duration;

/// HTTP client shared by the network destinations
pub fn create_default_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .use_rustls_tls()
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(30))
        .user_agent(concat!("bulwark-alerts/", env!("CARGO_PKG_VERSION")))
        .build()
}
