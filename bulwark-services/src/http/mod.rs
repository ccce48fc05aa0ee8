//! reqwest-backed clients for the real providers
//!
//! Both clients translate every non-success status and transport failure into
//! a classified [`ServiceError`] so the resilience layer can decide whether to
//! retry.

pub mod llm;
pub mod speech;

pub use llm::{HttpLanguageModelClient, LanguageModelConfig};
pub use speech::{HttpSpeechClient, SpeechClientConfig};

use bulwark_resilience::{FailureKind, ServiceError};
use std::time::Duration;

/// Build a client with rustls and the given request timeout
pub(crate) fn create_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(30))
        .user_agent(concat!("bulwark/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Classify a non-success response
pub fn status_error(service: &str, status: u16, body: &str) -> ServiceError {
    let summary = match FailureKind::from_status(status) {
        FailureKind::ServiceUnavailable if status == 503 => "Service temporarily unavailable".to_string(),
        FailureKind::ServiceUnavailable => format!("Server error: {}", status),
        FailureKind::Timeout => "Request timeout".to_string(),
        FailureKind::AuthenticationFailure => "Authentication failed".to_string(),
        FailureKind::InvalidRequest => "Invalid request payload".to_string(),
        FailureKind::QuotaExceeded => "Rate limit or quota exceeded".to_string(),
        _ => format!("Unexpected status: {}", status),
    };

    let message = if body.trim().is_empty() {
        summary
    } else {
        format!("{} ({})", summary, truncate(body.trim(), 200))
    };
    ServiceError::from_status(service, status, message)
}

/// Classify a failure to complete the request at all
pub fn transport_error(service: &str, error: reqwest::Error) -> ServiceError {
    // Some providers take the API key in the URL; never echo it.
    let error = error.without_url();
    if error.is_timeout() {
        ServiceError::timeout(service, "Request timeout")
    } else if error.is_connect() {
        ServiceError::network(service, format!("Network connection error: {}", error))
    } else {
        ServiceError::network(service, format!("Request failed: {}", error))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
