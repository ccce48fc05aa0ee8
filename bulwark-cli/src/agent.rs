//! Call orchestration with graceful degradation
//!
//! A call needs two services in sequence: the language model writes the
//! script, then the speech provider voices it. Both go through the shared
//! [`ResilientInvoker`]. When either step finally fails the call is recorded
//! as `CALL_FAILED` and skipped; a batch carries on with the next contact.

use bulwark_logging::{EventCategory, MemorySink, ServiceEvent};
use bulwark_resilience::{HealthMonitor, ResilienceError, ResilientInvoker, ServiceError};
use bulwark_services::{
    ChatMessage, FailureSchedule, LanguageModel, ScriptedService, ServiceProbe, SpeechAudio,
    SpeechRequest, SpeechSynthesizer, LLM_SERVICE, SPEECH_SERVICE,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::status::SystemStatus;

/// Service name used for agent-level events
pub const AGENT_NAME: &str = "CallAgent";

/// Error type surfaced by a failed call
pub type CallError = ResilienceError<ServiceError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone: String,
}

impl Contact {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
        }
    }
}

/// A completed call
#[derive(Debug, Clone, Serialize)]
pub struct CallOutcome {
    pub contact: Contact,
    pub script: String,
    pub voice_id: String,
    pub audio_bytes: usize,
    pub timestamp: DateTime<Utc>,
}

/// A skipped call
#[derive(Debug, Clone, Serialize)]
pub struct FailedCall {
    pub contact: Contact,
    pub error: String,
    pub circuit_open: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub completed: Vec<CallOutcome>,
    pub failed: Vec<FailedCall>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len()
    }

    pub fn success_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.completed.len() as f64 / total as f64,
        }
    }
}

/// The service clients a call agent talks to
#[derive(Clone)]
pub struct ServiceSet {
    pub llm: Arc<dyn LanguageModel>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    /// Handle on the scripted speech service in simulated mode
    pub speech_simulator: Option<Arc<ScriptedService<SpeechAudio>>>,
}

impl ServiceSet {
    /// Scripted clients that succeed unless told otherwise
    pub fn simulated() -> Self {
        let speech = Arc::new(ScriptedService::speech(FailureSchedule::Never));
        Self {
            llm: Arc::new(ScriptedService::language_model(FailureSchedule::Never)),
            speech: speech.clone(),
            speech_simulator: Some(speech),
        }
    }
}

pub struct CallAgent {
    invoker: Arc<ResilientInvoker>,
    services: ServiceSet,
    health: HealthMonitor,
    recent: Option<Arc<MemorySink>>,
    voice_id: String,
}

impl CallAgent {
    pub fn new(
        invoker: Arc<ResilientInvoker>,
        services: ServiceSet,
        health: HealthMonitor,
        voice_id: impl Into<String>,
    ) -> Self {
        health.register(LLM_SERVICE, Arc::new(ServiceProbe::new(services.llm.clone())));
        health.register(
            SPEECH_SERVICE,
            Arc::new(ServiceProbe::new(services.speech.clone())),
        );

        // Create both breakers up front so status always lists them.
        invoker.breaker(LLM_SERVICE);
        invoker.breaker(SPEECH_SERVICE);

        Self {
            invoker,
            services,
            health,
            recent: None,
            voice_id: voice_id.into(),
        }
    }

    /// Keep a handle on the in-memory event buffer for status reports
    pub fn with_recent_events(mut self, sink: Arc<MemorySink>) -> Self {
        self.recent = Some(sink);
        self
    }

    pub fn invoker(&self) -> &ResilientInvoker {
        &self.invoker
    }

    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }

    /// Make the speech service fail according to `schedule`.
    ///
    /// Returns false when the agent talks to real providers.
    pub fn simulate_speech_outage(&self, schedule: FailureSchedule) -> bool {
        match &self.services.speech_simulator {
            Some(simulator) => {
                info!(schedule = ?schedule, "speech simulation schedule updated");
                simulator.set_schedule(schedule);
                true
            }
            None => {
                warn!("outage simulation is only available in simulated mode");
                false
            }
        }
    }

    pub async fn make_call(&self, contact: &Contact) -> Result<CallOutcome, CallError> {
        info!(contact = %contact.name, phone = %contact.phone, "initiating call");

        match self.place_call(contact).await {
            Ok(outcome) => {
                info!(contact = %contact.name, "call completed");
                Ok(outcome)
            }
            Err(error) => {
                warn!(contact = %contact.name, "graceful degradation: skipping call");
                self.invoker.events().record(
                    &ServiceEvent::new(
                        AGENT_NAME,
                        EventCategory::CallFailed,
                        format!("Call to {} failed: {}", contact.name, error),
                    )
                    .with_field("contact", contact.name.clone())
                    .with_field("phone", contact.phone.clone()),
                );
                Err(error)
            }
        }
    }

    async fn place_call(&self, contact: &Contact) -> Result<CallOutcome, CallError> {
        let messages = [
            ChatMessage::system("Generate a professional call script."),
            ChatMessage::user(format!("Create a call script for {}", contact.name)),
        ];
        let llm = &self.services.llm;
        let completion = self
            .invoker
            .invoke(LLM_SERVICE, || llm.complete(&messages))
            .await?;

        let request = SpeechRequest::new(completion.text.clone(), self.voice_id.clone());
        let speech = &self.services.speech;
        let audio = self
            .invoker
            .invoke(SPEECH_SERVICE, || speech.synthesize(&request))
            .await?;

        Ok(CallOutcome {
            contact: contact.clone(),
            script: completion.text,
            voice_id: audio.voice_id,
            audio_bytes: audio.data.len(),
            timestamp: Utc::now(),
        })
    }

    /// Call every contact in order, skipping the ones that fail
    pub async fn run_batch(&self, contacts: &[Contact]) -> BatchReport {
        let mut report = BatchReport::default();
        for contact in contacts {
            match self.make_call(contact).await {
                Ok(outcome) => report.completed.push(outcome),
                Err(error) => report.failed.push(FailedCall {
                    contact: contact.clone(),
                    circuit_open: error.is_circuit_open(),
                    error: error.to_string(),
                }),
            }
        }
        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            "batch finished"
        );
        report
    }

    pub fn system_status(&self) -> SystemStatus {
        SystemStatus {
            timestamp: Utc::now(),
            circuit_breakers: self.invoker.snapshots(),
            health: self.health.get_all_health().into_iter().collect(),
            recent_events: self
                .recent
                .as_ref()
                .map(|sink| sink.events())
                .unwrap_or_default(),
        }
    }

    /// Close every breaker and stop any simulated outage
    pub fn reset(&self) {
        self.invoker.reset_all();
        if let Some(simulator) = &self.services.speech_simulator {
            simulator.set_schedule(FailureSchedule::Never);
        }
        info!("system reset: all circuit breakers closed");
    }

    pub fn start_health_monitoring(&self) {
        self.health.start();
    }

    /// Stop health polling and wait for alerts still in delivery
    pub async fn shutdown(&self) {
        self.health.stop().await;
        self.invoker.flush_alerts().await;
    }
}
