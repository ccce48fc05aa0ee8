//! Operator alerting for Bulwark
//!
//! Alerts are raised by the resilience layer when a call finally fails or a
//! circuit opens. An [`AlertDispatcher`] fans each alert out to the configured
//! [`AlertSink`]s: the tracing log, a JSON webhook, a Telegram chat, or email.

pub mod alert;
pub mod destinations;
pub mod dispatcher;
pub mod errors;

pub use alert::{Alert, AlertSeverity};
pub use destinations::{
    EmailAlertSink, EmailConfig, LogAlertSink, SmtpSecurity, TelegramAlertSink, TelegramConfig,
    WebhookAlertSink, WebhookConfig,
};
pub use dispatcher::{AlertDispatcher, AlertSink, DispatchReport};
pub use errors::AlertError;
