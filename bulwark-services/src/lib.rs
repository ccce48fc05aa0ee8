//! Remote service clients for Bulwark
//!
//! Contracts for the two providers a call depends on (speech synthesis and
//! a chat language model), reqwest implementations of each, scripted fakes,
//! and an adapter that exposes any client to the health monitor.

pub mod client;
pub mod http;
pub mod probe;
pub mod scripted;
pub mod types;

/// Service name of the speech provider
pub const SPEECH_SERVICE: &str = "ElevenLabs";

/// Service name of the language model provider
pub const LLM_SERVICE: &str = "LLM";

pub use client::{LanguageModel, ServiceClient, SpeechSynthesizer};
pub use http::{HttpLanguageModelClient, HttpSpeechClient, LanguageModelConfig, SpeechClientConfig};
pub use probe::ServiceProbe;
pub use scripted::{FailureSchedule, ScriptedService};
pub use types::{ChatMessage, Completion, Role, SpeechAudio, SpeechRequest};
