//! Resilient invocation of remote operations
//!
//! [`ResilientInvoker::invoke`] gates a call on the service's circuit breaker,
//! runs the operation under the retry policy, and records the outcome in the
//! event log before handing it back. Alerts are delivered on background tasks
//! so a slow destination never delays the caller. The breaker sees one
//! outcome per invocation, not one per retry attempt.

use bulwark_alerts::{Alert, AlertDispatcher, AlertSeverity};
use bulwark_logging::{EventCategory, EventLog, ServiceEvent};
use humantime_serde::re::humantime::format_duration;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::clock::{Clock, SystemClock};
use crate::error::{Classified, ResilienceError};
use crate::retry::{Retried, RetryExecutor, RetryPolicy};

/// Breaker-gated, retrying invoker shared by all services
pub struct ResilientInvoker {
    retry: RetryExecutor,
    breaker_config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    breakers: RwLock<BTreeMap<String, CircuitBreaker>>,
    events: EventLog,
    alerts: Arc<AlertDispatcher>,
    pending_alerts: Mutex<JoinSet<()>>,
}

impl ResilientInvoker {
    pub fn builder() -> InvokerBuilder {
        InvokerBuilder::default()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.retry.policy()
    }

    pub fn breaker_config(&self) -> &CircuitBreakerConfig {
        &self.breaker_config
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn alerts(&self) -> &AlertDispatcher {
        &self.alerts
    }

    /// Breaker for `service`, created on first use
    pub fn breaker(&self, service: &str) -> CircuitBreaker {
        if let Some(breaker) = self.breakers.read().get(service) {
            return breaker.clone();
        }

        let mut breakers = self.breakers.write();
        breakers
            .entry(service.to_string())
            .or_insert_with(|| {
                CircuitBreaker::with_clock(
                    service,
                    self.breaker_config.clone(),
                    Arc::clone(&self.clock),
                )
            })
            .clone()
    }

    /// Snapshots of every breaker created so far, ordered by service name
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        self.breakers
            .read()
            .values()
            .map(CircuitBreaker::snapshot)
            .collect()
    }

    /// Reset one breaker. Returns false if the service has no breaker yet.
    pub fn reset(&self, service: &str) -> bool {
        match self.breakers.read().get(service) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    pub fn reset_all(&self) {
        for breaker in self.breakers.read().values() {
            breaker.reset();
        }
    }

    /// Run `operation` against `service` with breaker protection and retries.
    ///
    /// Every failure is logged and alerted before it is returned; nothing is
    /// swallowed.
    pub async fn invoke<F, Fut, T, E>(
        &self,
        service: &str,
        operation: F,
    ) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classified + Display,
    {
        let breaker = self.breaker(service);
        let outcome = breaker
            .call(|| self.retry.execute(service, operation))
            .await;

        match outcome {
            Ok(Retried { value, retries }) => {
                self.events.record(
                    &ServiceEvent::new(
                        service,
                        EventCategory::Success,
                        format!("{service} call succeeded"),
                    )
                    .with_retry_count(retries)
                    .with_circuit_state(breaker.state()),
                );
                Ok(value)
            }
            Err(error) => {
                self.report_failure(&breaker, &error);
                Err(error)
            }
        }
    }

    /// Wait until every alert raised so far has been delivered or has failed
    pub async fn flush_alerts(&self) {
        let mut pending = std::mem::take(&mut *self.pending_alerts.lock());
        while pending.join_next().await.is_some() {}
    }

    fn report_failure<E: Display>(&self, breaker: &CircuitBreaker, error: &ResilienceError<E>) {
        let service = breaker.service();
        let (event, alert) = match error {
            ResilienceError::CircuitOpen(open) => (
                ServiceEvent::new(service, EventCategory::CircuitBreakerOpen, open.to_string())
                    .with_circuit_state(CircuitState::Open)
                    .with_field("retry_in_ms", open.retry_in.as_millis() as u64),
                Alert::new(
                    format!("Circuit Breaker Opened - {service}"),
                    format!(
                        "The circuit breaker for {service} has opened due to repeated failures.\n\n\
                         This indicates the service is currently unavailable.\n\
                         Automatic recovery will be attempted in {}.",
                        format_duration(open.retry_in)
                    ),
                    AlertSeverity::High,
                ),
            ),
            ResilienceError::RetriesExhausted {
                attempts,
                last_error,
            } => (
                ServiceEvent::new(
                    service,
                    EventCategory::TransientError,
                    format!("Failed after {attempts} attempts: {last_error}"),
                )
                .with_retry_count(*attempts)
                .with_circuit_state(breaker.state()),
                Alert::new(
                    format!("{service} - Max Retries Exceeded"),
                    format!(
                        "Call to {service} failed after {attempts} attempts.\n\n\
                         Error: {last_error}\n\n\
                         Action required: please investigate {service} service health."
                    ),
                    AlertSeverity::Critical,
                ),
            ),
            ResilienceError::Permanent(inner) => (
                ServiceEvent::new(
                    service,
                    EventCategory::PermanentError,
                    format!("Permanent error (no retry): {inner}"),
                )
                .with_circuit_state(breaker.state()),
                Alert::new(
                    format!("{service} - Permanent Error"),
                    format!(
                        "Non-recoverable error in {service}.\n\n\
                         Error: {inner}\n\n\
                         This error cannot be resolved through retries. Manual intervention required."
                    ),
                    AlertSeverity::Critical,
                ),
            ),
        };

        self.events.record(&event);
        self.dispatch_alert(alert);
    }

    fn dispatch_alert(&self, alert: Alert) {
        if self.alerts.is_empty() {
            return;
        }

        let alerts = Arc::clone(&self.alerts);
        let mut pending = self.pending_alerts.lock();
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            alerts.notify(&alert).await;
        });
    }
}

/// Builder for [`ResilientInvoker`]
pub struct InvokerBuilder {
    retry_policy: RetryPolicy,
    breaker_config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    events: EventLog,
    alerts: AlertDispatcher,
}

impl Default for InvokerBuilder {
    fn default() -> Self {
        Self {
            retry_policy: RetryPolicy::default(),
            breaker_config: CircuitBreakerConfig::default(),
            clock: Arc::new(SystemClock),
            events: EventLog::new(),
            alerts: AlertDispatcher::new(),
        }
    }
}

impl InvokerBuilder {
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker_config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    pub fn alerts(mut self, alerts: AlertDispatcher) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn build(self) -> ResilientInvoker {
        ResilientInvoker {
            retry: RetryExecutor::new(self.retry_policy),
            breaker_config: self.breaker_config,
            clock: self.clock,
            breakers: RwLock::new(BTreeMap::new()),
            events: self.events,
            alerts: Arc::new(self.alerts),
            pending_alerts: Mutex::new(JoinSet::new()),
        }
    }
}
