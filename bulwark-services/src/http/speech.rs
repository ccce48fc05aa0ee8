use async_trait::async_trait;
use bulwark_resilience::ServiceError;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{create_client, status_error, transport_error};
use crate::client::{ServiceClient, SpeechSynthesizer};
use crate::types::{SpeechAudio, SpeechRequest};
use crate::SPEECH_SERVICE;

/// Text-to-speech endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechClientConfig {
    /// Synthesis endpoint; the voice id is appended as a path segment
    pub url: String,

    /// Endpoint polled by health checks
    pub health_url: String,

    pub api_key: Option<String>,

    pub model_id: Option<String>,

    pub default_voice_id: String,

    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SpeechClientConfig {
    fn default() -> Self {
        Self {
            url: "https://api.elevenlabs.io/v1/text-to-speech".to_string(),
            health_url: "https://api.elevenlabs.io/v1/voices".to_string(),
            api_key: None,
            model_id: None,
            default_voice_id: "professional_male".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct SynthesisBody<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_id: Option<&'a str>,
}

/// ElevenLabs-style speech client
#[derive(Debug, Clone)]
pub struct HttpSpeechClient {
    config: SpeechClientConfig,
    client: reqwest::Client,
}

impl HttpSpeechClient {
    pub fn new(config: SpeechClientConfig) -> Result<Self, ServiceError> {
        let client = create_client(config.timeout)
            .map_err(|e| ServiceError::network(SPEECH_SERVICE, format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &SpeechClientConfig {
        &self.config
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header("xi-api-key", key),
            None => request,
        }
    }
}

#[async_trait]
impl ServiceClient for HttpSpeechClient {
    fn name(&self) -> &str {
        SPEECH_SERVICE
    }

    async fn health_check(&self) -> Result<bool, ServiceError> {
        let response = self
            .authorize(self.client.get(&self.config.health_url))
            .send()
            .await
            .map_err(|e| transport_error(SPEECH_SERVICE, e))?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechClient {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechAudio, ServiceError> {
        let voice_id = if request.voice_id.is_empty() {
            self.config.default_voice_id.as_str()
        } else {
            request.voice_id.as_str()
        };
        let url = format!("{}/{}", self.config.url.trim_end_matches('/'), voice_id);
        info!(service = SPEECH_SERVICE, voice_id, "making text-to-speech request");

        let body = SynthesisBody {
            text: &request.text,
            model_id: self.config.model_id.as_deref(),
        };
        let response = self
            .authorize(self.client.post(&url))
            .header(ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(SPEECH_SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(SPEECH_SERVICE, status.as_u16(), &text));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();
        let data = response
            .bytes()
            .await
            .map_err(|e| transport_error(SPEECH_SERVICE, e))?
            .to_vec();
        debug!(service = SPEECH_SERVICE, bytes = data.len(), "received audio");

        Ok(SpeechAudio {
            voice_id: voice_id.to_string(),
            content_type,
            data,
        })
    }
}
