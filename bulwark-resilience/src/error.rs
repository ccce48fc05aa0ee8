//! Failure taxonomy for remote service calls
//!
//! Every failure a client adapter reports is a [`ServiceError`] carrying a
//! [`FailureKind`]. [`classify`] is the single authority on whether a kind is
//! worth retrying; the retry engine and the invoker only ever look at the
//! resulting [`ErrorClass`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Concrete failure reported by a service adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Request timed out (408/504 or client-side deadline)
    Timeout,
    /// Connection could not be established or was dropped
    NetworkError,
    /// 503 or another 5xx response
    ServiceUnavailable,
    /// Credentials rejected (401/403)
    AuthenticationFailure,
    /// Malformed request payload (400/422)
    InvalidRequest,
    /// Rate limit or quota exhausted (429)
    QuotaExceeded,
    /// Anything the adapter could not map
    Unrecognized,
}

impl FailureKind {
    /// Map an HTTP-like status code onto a failure kind
    pub fn from_status(status: u16) -> Self {
        match status {
            503 => FailureKind::ServiceUnavailable,
            408 | 504 => FailureKind::Timeout,
            401 | 403 => FailureKind::AuthenticationFailure,
            400 | 422 => FailureKind::InvalidRequest,
            429 => FailureKind::QuotaExceeded,
            500..=599 => FailureKind::ServiceUnavailable,
            _ => FailureKind::Unrecognized,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::NetworkError => "network error",
            FailureKind::ServiceUnavailable => "service unavailable",
            FailureKind::AuthenticationFailure => "authentication failure",
            FailureKind::InvalidRequest => "invalid request",
            FailureKind::QuotaExceeded => "quota exceeded",
            FailureKind::Unrecognized => "unrecognized failure",
        };
        f.write_str(label)
    }
}

/// Retry-eligible failure subkinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransientKind {
    Timeout,
    NetworkError,
    ServiceUnavailable,
}

/// Failure subkinds that retrying cannot fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermanentKind {
    AuthenticationFailure,
    InvalidRequest,
    QuotaExceeded,
    Unrecognized,
}

/// Top-level classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Transient(TransientKind),
    Permanent(PermanentKind),
    /// Raised by a circuit breaker, never by a remote operation
    CircuitOpen,
}

impl ErrorClass {
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorClass::Transient(_))
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, ErrorClass::Permanent(_))
    }
}

/// Classify a failure kind. Unknown conditions are permanent so they are never retried.
pub fn classify(kind: FailureKind) -> ErrorClass {
    match kind {
        FailureKind::Timeout => ErrorClass::Transient(TransientKind::Timeout),
        FailureKind::NetworkError => ErrorClass::Transient(TransientKind::NetworkError),
        FailureKind::ServiceUnavailable => ErrorClass::Transient(TransientKind::ServiceUnavailable),
        FailureKind::AuthenticationFailure => {
            ErrorClass::Permanent(PermanentKind::AuthenticationFailure)
        }
        FailureKind::InvalidRequest => ErrorClass::Permanent(PermanentKind::InvalidRequest),
        FailureKind::QuotaExceeded => ErrorClass::Permanent(PermanentKind::QuotaExceeded),
        FailureKind::Unrecognized => ErrorClass::Permanent(PermanentKind::Unrecognized),
    }
}

/// Errors that can be placed in the failure taxonomy
pub trait Classified {
    /// Classification of this error
    fn class(&self) -> ErrorClass;

    /// Whether the retry engine may try again after this error
    fn is_retryable(&self) -> bool {
        self.class().is_transient()
    }
}

/// Classified failure from a remote service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{service}] {kind}: {message}")]
pub struct ServiceError {
    pub service: String,
    pub kind: FailureKind,
    pub message: String,
    /// Status code the adapter saw, if any
    pub status: Option<u16>,
}

impl ServiceError {
    pub fn new(service: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Build an error from a non-success status code
    pub fn from_status(service: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            kind: FailureKind::from_status(status),
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn timeout(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(service, FailureKind::Timeout, message)
    }

    pub fn network(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(service, FailureKind::NetworkError, message)
    }

    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(service, FailureKind::ServiceUnavailable, message)
    }

    pub fn authentication(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(service, FailureKind::AuthenticationFailure, message)
    }

    pub fn invalid_request(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(service, FailureKind::InvalidRequest, message)
    }

    pub fn quota_exceeded(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(service, FailureKind::QuotaExceeded, message)
    }
}

impl Classified for ServiceError {
    fn class(&self) -> ErrorClass {
        classify(self.kind)
    }
}

/// Rejection raised by an open circuit breaker
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("circuit breaker is open for {service}, next probe in {retry_in:?}")]
pub struct CircuitOpenError {
    pub service: String,
    /// Time left until the breaker admits a probe call
    pub retry_in: Duration,
}

impl Classified for CircuitOpenError {
    fn class(&self) -> ErrorClass {
        ErrorClass::CircuitOpen
    }
}

/// Reporting category of a call outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeCategory {
    CircuitOpen,
    TransientExhausted,
    Permanent,
}

/// Final failure of a protected call
#[derive(Debug, thiserror::Error)]
pub enum ResilienceError<E> {
    /// The breaker rejected the call without invoking the operation
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    /// Transient failures used up every attempt
    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: E },

    /// Failure that is never retried
    #[error("permanent failure: {0}")]
    Permanent(E),
}

impl<E> ResilienceError<E> {
    pub fn category(&self) -> OutcomeCategory {
        match self {
            ResilienceError::CircuitOpen(_) => OutcomeCategory::CircuitOpen,
            ResilienceError::RetriesExhausted { .. } => OutcomeCategory::TransientExhausted,
            ResilienceError::Permanent(_) => OutcomeCategory::Permanent,
        }
    }

    /// Underlying service error, if the operation ran at all
    pub fn into_inner(self) -> Option<E> {
        match self {
            ResilienceError::CircuitOpen(_) => None,
            ResilienceError::RetriesExhausted { last_error, .. } => Some(last_error),
            ResilienceError::Permanent(error) => Some(error),
        }
    }

    pub fn source_error(&self) -> Option<&E> {
        match self {
            ResilienceError::CircuitOpen(_) => None,
            ResilienceError::RetriesExhausted { last_error, .. } => Some(last_error),
            ResilienceError::Permanent(error) => Some(error),
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen(_))
    }

    /// Attempts made before giving up (0 when the breaker rejected the call)
    pub fn attempts(&self) -> u32 {
        match self {
            ResilienceError::CircuitOpen(_) => 0,
            ResilienceError::RetriesExhausted { attempts, .. } => *attempts,
            ResilienceError::Permanent(_) => 1,
        }
    }
}

impl<E: Classified> Classified for ResilienceError<E> {
    fn class(&self) -> ErrorClass {
        match self {
            ResilienceError::CircuitOpen(_) => ErrorClass::CircuitOpen,
            ResilienceError::RetriesExhausted { last_error, .. } => last_error.class(),
            ResilienceError::Permanent(error) => error.class(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        for kind in [
            FailureKind::Timeout,
            FailureKind::NetworkError,
            FailureKind::ServiceUnavailable,
        ] {
            assert!(classify(kind).is_transient(), "{kind} should be transient");
        }
    }

    #[test]
    fn test_permanent_kinds() {
        for kind in [
            FailureKind::AuthenticationFailure,
            FailureKind::InvalidRequest,
            FailureKind::QuotaExceeded,
            FailureKind::Unrecognized,
        ] {
            assert!(classify(kind).is_permanent(), "{kind} should be permanent");
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(FailureKind::from_status(503), FailureKind::ServiceUnavailable);
        assert_eq!(FailureKind::from_status(502), FailureKind::ServiceUnavailable);
        assert_eq!(FailureKind::from_status(504), FailureKind::Timeout);
        assert_eq!(FailureKind::from_status(408), FailureKind::Timeout);
        assert_eq!(FailureKind::from_status(401), FailureKind::AuthenticationFailure);
        assert_eq!(FailureKind::from_status(400), FailureKind::InvalidRequest);
        assert_eq!(FailureKind::from_status(429), FailureKind::QuotaExceeded);
        assert_eq!(FailureKind::from_status(404), FailureKind::Unrecognized);
        assert_eq!(FailureKind::from_status(302), FailureKind::Unrecognized);
    }

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::from_status("ElevenLabs", 503, "Service temporarily unavailable");
        assert_eq!(err.status, Some(503));
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "[ElevenLabs] service unavailable: Service temporarily unavailable"
        );
    }

    #[test]
    fn test_resilience_error_class() {
        let open: ResilienceError<ServiceError> = CircuitOpenError {
            service: "LLM".to_string(),
            retry_in: Duration::from_secs(10),
        }
        .into();
        assert_eq!(open.class(), ErrorClass::CircuitOpen);
        assert_eq!(open.category(), OutcomeCategory::CircuitOpen);
        assert_eq!(open.attempts(), 0);
        assert!(open.into_inner().is_none());

        let exhausted = ResilienceError::RetriesExhausted {
            attempts: 3,
            last_error: ServiceError::timeout("LLM", "slow"),
        };
        assert_eq!(exhausted.class(), ErrorClass::Transient(TransientKind::Timeout));
        assert_eq!(exhausted.attempts(), 3);

        let permanent = ResilienceError::Permanent(ServiceError::quota_exceeded("LLM", "quota"));
        assert_eq!(
            permanent.class(),
            ErrorClass::Permanent(PermanentKind::QuotaExceeded)
        );
        assert!(!permanent.is_retryable());
    }
}
