use async_trait::async_trait;

use crate::alert::{Alert, AlertSeverity};
use crate::dispatcher::AlertSink;
use crate::errors::AlertError;

/// Writes alerts to the tracing log. Always succeeds.
#[derive(Debug, Clone, Default)]
pub struct LogAlertSink;

impl LogAlertSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertSink for LogAlertSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, alert: &Alert) -> Result<(), AlertError> {
        match alert.severity {
            AlertSeverity::Critical | AlertSeverity::High => tracing::error!(
                severity = %alert.severity,
                subject = %alert.subject,
                "ALERT: {}",
                alert.message
            ),
            AlertSeverity::Medium => tracing::warn!(
                severity = %alert.severity,
                subject = %alert.subject,
                "ALERT: {}",
                alert.message
            ),
            AlertSeverity::Low | AlertSeverity::Info => tracing::info!(
                severity = %alert.severity,
                subject = %alert.subject,
                "ALERT: {}",
                alert.message
            ),
        }
        Ok(())
    }
}
