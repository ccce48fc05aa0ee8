//! Fan-out of alerts to every configured sink

use async_trait::async_trait;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;

use crate::alert::{Alert, AlertSeverity};
use crate::errors::AlertError;

/// A place alerts can be delivered to
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Short name used in logs and delivery reports
    fn name(&self) -> &str;

    async fn notify(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// Outcome of one dispatch round
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    /// `(sink name, error text)` for every failed delivery
    pub failed: Vec<(String, String)>,
    /// True when the alert was below the dispatcher's minimum severity
    pub suppressed: bool,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty() && !self.suppressed
    }
}

/// Sends alerts to all sinks concurrently.
///
/// Delivery failures are logged and reported, never propagated: an alert that
/// cannot be delivered must not change the outcome of the call that raised it.
#[derive(Clone, Default)]
pub struct AlertDispatcher {
    sinks: Vec<Arc<dyn AlertSink>>,
    min_severity: Option<AlertSeverity>,
}

impl AlertDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Arc<dyn AlertSink>) {
        self.sinks.push(sink);
    }

    /// Drop alerts below `severity`
    pub fn min_severity(mut self, severity: AlertSeverity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub async fn notify(&self, alert: &Alert) -> DispatchReport {
        if self.min_severity.is_some_and(|min| alert.severity < min) {
            tracing::debug!(
                subject = %alert.subject,
                severity = %alert.severity,
                "alert below minimum severity, suppressed"
            );
            return DispatchReport {
                suppressed: true,
                ..DispatchReport::default()
            };
        }

        let results = join_all(self.sinks.iter().map(|sink| async move {
            (sink.name().to_string(), sink.notify(alert).await)
        }))
        .await;

        let mut report = DispatchReport::default();
        for (name, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::error!(sink = %name, subject = %alert.subject, "failed to deliver alert: {}", e);
                    report.failed.push((name, e.to_string()));
                }
            }
        }
        report
    }
}

impl fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertDispatcher")
            .field("sinks", &self.sink_names())
            .field("min_severity", &self.min_severity)
            .finish()
    }
}
