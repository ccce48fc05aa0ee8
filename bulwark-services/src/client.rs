//! Contracts implemented by every remote service adapter

use async_trait::async_trait;
use bulwark_resilience::ServiceError;

use crate::types::{ChatMessage, Completion, SpeechAudio, SpeechRequest};

/// A remote dependency with a name and a liveness check
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// Name used for breakers, events and alerts
    fn name(&self) -> &str;

    async fn health_check(&self) -> Result<bool, ServiceError>;
}

/// Text-to-speech provider
#[async_trait]
pub trait SpeechSynthesizer: ServiceClient {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechAudio, ServiceError>;
}

/// Chat-completion provider
#[async_trait]
pub trait LanguageModel: ServiceClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, ServiceError>;
}
