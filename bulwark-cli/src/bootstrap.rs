//! Assemble a call agent from configuration

use anyhow::{Context, Result};
use bulwark_alerts::{
    AlertDispatcher, EmailAlertSink, LogAlertSink, TelegramAlertSink, WebhookAlertSink,
};
use bulwark_config::{AlertsConfig, BulwarkConfig, ServiceMode, ServicesConfig};
use bulwark_logging::{EventLog, JsonlFileSink, LoggingConfig, MemorySink, TracingSink};
use bulwark_resilience::{HealthMonitor, ResilientInvoker};
use bulwark_services::{HttpLanguageModelClient, HttpSpeechClient};
use std::sync::Arc;
use tracing::{debug, info};

use crate::agent::{CallAgent, ServiceSet};

/// Event log plus the in-memory buffer it feeds
pub fn build_event_log(config: &LoggingConfig) -> Result<(EventLog, Arc<MemorySink>)> {
    let memory = Arc::new(MemorySink::new(config.memory_capacity));
    let mut events = EventLog::new().with_sink(memory.clone());

    if let Some(path) = &config.event_log {
        let sink = JsonlFileSink::open(path)
            .with_context(|| format!("Failed to open event log {:?}", path))?;
        events.add_sink(Arc::new(sink));
        debug!("Recording service events to {:?}", path);
    }
    if config.echo_events {
        events.add_sink(Arc::new(TracingSink));
    }
    Ok((events, memory))
}

/// Alert dispatcher with every configured destination
pub fn build_alerts(config: &AlertsConfig) -> Result<AlertDispatcher> {
    let mut alerts = AlertDispatcher::new().min_severity(config.min_severity);

    if config.log {
        alerts.add_sink(Arc::new(LogAlertSink::new()));
    }
    if let Some(webhook) = &config.webhook {
        alerts.add_sink(Arc::new(
            WebhookAlertSink::from_config(webhook.clone()).context("Invalid webhook alert config")?,
        ));
    }
    if let Some(telegram) = &config.telegram {
        alerts.add_sink(Arc::new(
            TelegramAlertSink::from_config(telegram.clone())
                .context("Invalid telegram alert config")?,
        ));
    }
    if let Some(email) = &config.email {
        alerts.add_sink(Arc::new(
            EmailAlertSink::from_config(email.clone()).context("Invalid email alert config")?,
        ));
    }

    debug!(sinks = ?alerts.sink_names(), "alert destinations configured");
    Ok(alerts)
}

pub fn build_services(config: &ServicesConfig) -> Result<ServiceSet> {
    match config.mode {
        ServiceMode::Simulated => {
            info!("Using simulated services");
            Ok(ServiceSet::simulated())
        }
        ServiceMode::Live => {
            info!("Using live services");
            let llm = HttpLanguageModelClient::new(config.llm.clone())
                .context("Failed to create language model client")?;
            let speech = HttpSpeechClient::new(config.speech.clone())
                .context("Failed to create speech client")?;
            Ok(ServiceSet {
                llm: Arc::new(llm),
                speech: Arc::new(speech),
                speech_simulator: None,
            })
        }
    }
}

pub fn build_agent(config: &BulwarkConfig) -> Result<CallAgent> {
    let (events, memory) = build_event_log(&config.logging)?;
    let alerts = build_alerts(&config.alerts)?;
    let services = build_services(&config.services)?;

    let invoker = ResilientInvoker::builder()
        .retry_policy(config.retry.clone())
        .breaker_config(config.circuit_breaker.clone())
        .events(events)
        .alerts(alerts)
        .build();

    let agent = CallAgent::new(
        Arc::new(invoker),
        services,
        HealthMonitor::new(config.health.clone()),
        config.services.speech.default_voice_id.clone(),
    )
    .with_recent_events(memory);

    Ok(agent)
}
