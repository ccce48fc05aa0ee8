use async_trait::async_trait;
use bulwark_resilience::{FailureKind, ServiceError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use super::{create_client, status_error, transport_error};
use crate::client::{LanguageModel, ServiceClient};
use crate::types::{ChatMessage, Completion};
use crate::LLM_SERVICE;

/// Chat-completions endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageModelConfig {
    pub url: String,
    pub health_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: Option<u32>,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for LanguageModelConfig {
    fn default() -> Self {
        Self {
            url: "https://api.openai.com/v1/chat/completions".to_string(),
            health_url: "https://api.openai.com/v1/models".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: Some(500),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// OpenAI-style chat completions client
#[derive(Debug, Clone)]
pub struct HttpLanguageModelClient {
    config: LanguageModelConfig,
    client: reqwest::Client,
}

impl HttpLanguageModelClient {
    pub fn new(config: LanguageModelConfig) -> Result<Self, ServiceError> {
        let client = create_client(config.timeout)
            .map_err(|e| ServiceError::network(LLM_SERVICE, format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &LanguageModelConfig {
        &self.config
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl ServiceClient for HttpLanguageModelClient {
    fn name(&self) -> &str {
        LLM_SERVICE
    }

    async fn health_check(&self) -> Result<bool, ServiceError> {
        let response = self
            .authorize(self.client.get(&self.config.health_url))
            .send()
            .await
            .map_err(|e| transport_error(LLM_SERVICE, e))?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModelClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, ServiceError> {
        info!(service = LLM_SERVICE, model = %self.config.model, "generating response");

        let body = CompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
        };
        let response = self
            .authorize(self.client.post(&self.config.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(LLM_SERVICE, e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(LLM_SERVICE, e))?;
        if !status.is_success() {
            return Err(status_error(
                LLM_SERVICE,
                status.as_u16(),
                &String::from_utf8_lossy(&bytes),
            ));
        }

        let parsed: CompletionResponse = serde_json::from_slice(&bytes).map_err(|e| {
            ServiceError::new(
                LLM_SERVICE,
                FailureKind::Unrecognized,
                format!("Malformed completion response: {}", e),
            )
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                ServiceError::new(LLM_SERVICE, FailureKind::Unrecognized, "Completion contained no choices")
            })?;

        Ok(Completion {
            text,
            model: parsed.model,
            tokens_used: parsed.usage.map(|u| u.total_tokens),
        })
    }
}
