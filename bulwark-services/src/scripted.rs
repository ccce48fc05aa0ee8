//! Scripted stand-ins for the real providers
//!
//! A [`ScriptedService`] answers from a [`FailureSchedule`] instead of the
//! network. It drives the simulated mode of the call agent and the tests.

use async_trait::async_trait;
use bulwark_resilience::{FailureKind, ServiceError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::info;

use crate::client::{LanguageModel, ServiceClient, SpeechSynthesizer};
use crate::types::{ChatMessage, Completion, SpeechAudio, SpeechRequest};
use crate::{LLM_SERVICE, SPEECH_SERVICE};

/// Which calls fail, and how
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum FailureSchedule {
    #[default]
    Never,
    /// Calls `1..=count` fail with `kind`, later calls succeed
    FirstCalls { count: u32, kind: FailureKind },
    Always { kind: FailureKind },
    /// Explicit outcome per call; calls past the end succeed
    Script { outcomes: Vec<Option<FailureKind>> },
}

impl FailureSchedule {
    pub fn first_calls(count: u32, kind: FailureKind) -> Self {
        FailureSchedule::FirstCalls { count, kind }
    }

    /// Failure for the 1-based call number, or `None` if it succeeds
    pub fn outcome(&self, call: u32) -> Option<FailureKind> {
        match self {
            FailureSchedule::Never => None,
            FailureSchedule::FirstCalls { count, kind } => (call <= *count).then_some(*kind),
            FailureSchedule::Always { kind } => Some(*kind),
            FailureSchedule::Script { outcomes } => call
                .checked_sub(1)
                .and_then(|idx| outcomes.get(idx as usize))
                .copied()
                .flatten(),
        }
    }
}

/// Fake client returning `response` unless the schedule says otherwise
#[derive(Debug)]
pub struct ScriptedService<T> {
    name: String,
    response: T,
    schedule: Mutex<FailureSchedule>,
    calls: AtomicU32,
}

impl<T: Clone> ScriptedService<T> {
    pub fn new(name: impl Into<String>, response: T, schedule: FailureSchedule) -> Self {
        Self {
            name: name.into(),
            response,
            schedule: Mutex::new(schedule),
            calls: AtomicU32::new(0),
        }
    }

    /// Number of calls made so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Install a new schedule and restart the call count
    pub fn set_schedule(&self, schedule: FailureSchedule) {
        *self.schedule.lock() = schedule;
        self.calls.store(0, Ordering::SeqCst);
    }

    pub fn schedule(&self) -> FailureSchedule {
        self.schedule.lock().clone()
    }

    fn next(&self) -> Result<T, ServiceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.schedule.lock().outcome(call) {
            Some(kind) => {
                info!(service = %self.name, call, kind = %kind, "simulating failure");
                Err(simulated_error(&self.name, kind))
            }
            None => Ok(self.response.clone()),
        }
    }
}

fn simulated_error(service: &str, kind: FailureKind) -> ServiceError {
    let status = match kind {
        FailureKind::ServiceUnavailable => Some(503),
        FailureKind::Timeout => Some(504),
        FailureKind::AuthenticationFailure => Some(401),
        FailureKind::InvalidRequest => Some(400),
        FailureKind::QuotaExceeded => Some(429),
        FailureKind::NetworkError | FailureKind::Unrecognized => None,
    };
    let mut error = ServiceError::new(service, kind, format!("Simulated {}", kind));
    error.status = status;
    error
}

impl ScriptedService<SpeechAudio> {
    /// Speech service returning a short silent clip
    pub fn speech(schedule: FailureSchedule) -> Self {
        let audio = SpeechAudio {
            voice_id: "simulated".to_string(),
            content_type: "audio/mpeg".to_string(),
            data: vec![0u8; 1024],
        };
        Self::new(SPEECH_SERVICE, audio, schedule)
    }
}

impl ScriptedService<Completion> {
    pub fn language_model(schedule: FailureSchedule) -> Self {
        let completion = Completion {
            text: "Hello, this is a courtesy call to confirm your upcoming appointment.".to_string(),
            model: Some("simulated".to_string()),
            tokens_used: Some(150),
        };
        Self::new(LLM_SERVICE, completion, schedule)
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> ServiceClient for ScriptedService<T> {
    fn name(&self) -> &str {
        &self.name
    }

    /// Healthy once the next call would succeed
    async fn health_check(&self) -> Result<bool, ServiceError> {
        let next_call = self.calls() + 1;
        Ok(self.schedule.lock().outcome(next_call).is_none())
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedService<SpeechAudio> {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechAudio, ServiceError> {
        let mut audio = self.next()?;
        audio.voice_id = request.voice_id.clone();
        Ok(audio)
    }
}

#[async_trait]
impl LanguageModel for ScriptedService<Completion> {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<Completion, ServiceError> {
        self.next()
    }
}
