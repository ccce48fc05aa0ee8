use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// Category of a recorded service event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    Success,
    TransientError,
    PermanentError,
    CircuitBreakerOpen,
    /// A whole unit of work was abandoned after a service failure
    CallFailed,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Success => "SUCCESS",
            EventCategory::TransientError => "TRANSIENT_ERROR",
            EventCategory::PermanentError => "PERMANENT_ERROR",
            EventCategory::CircuitBreakerOpen => "CIRCUIT_BREAKER_OPEN",
            EventCategory::CallFailed => "CALL_FAILED",
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, EventCategory::Success)
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outcome of a call to a remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEvent {
    pub timestamp: DateTime<Utc>,
    pub service_name: String,
    pub category: EventCategory,
    pub retry_count: u32,
    pub circuit_state: String,
    pub message: String,
    #[serde(default, flatten, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, JsonValue>,
}

impl ServiceEvent {
    pub fn new(
        service_name: impl Into<String>,
        category: EventCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            service_name: service_name.into(),
            category,
            retry_count: 0,
            circuit_state: "N/A".to_string(),
            message: message.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_circuit_state(mut self, state: impl fmt::Display) -> Self {
        self.circuit_state = state.to_string();
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
