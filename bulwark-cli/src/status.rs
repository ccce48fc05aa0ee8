use bulwark_logging::ServiceEvent;
use bulwark_resilience::{BreakerSnapshot, CircuitState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Point-in-time view of breakers and service health
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub timestamp: DateTime<Utc>,
    pub circuit_breakers: Vec<BreakerSnapshot>,
    pub health: BTreeMap<String, bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recent_events: Vec<ServiceEvent>,
}

impl SystemStatus {
    /// True when every breaker is closed and every service answered its probe
    pub fn all_clear(&self) -> bool {
        self.circuit_breakers
            .iter()
            .all(|b| b.state == CircuitState::Closed)
            && self.health.values().all(|healthy| *healthy)
    }
}

fn describe(state: CircuitState) -> &'static str {
    match state {
        CircuitState::Closed => "Healthy",
        CircuitState::Open => "Unavailable",
        CircuitState::HalfOpen => "Testing",
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "System status at {}", self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f)?;
        writeln!(f, "Circuit breakers:")?;
        for breaker in &self.circuit_breakers {
            writeln!(
                f,
                "  {:20} | {:10} | {:12} | failures: {}",
                breaker.service,
                breaker.state.as_str(),
                describe(breaker.state),
                breaker.failure_count
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Service health:")?;
        for (service, healthy) in &self.health {
            let label = if *healthy { "Online" } else { "Offline" };
            writeln!(f, "  {:20} | {}", service, label)?;
        }

        if !self.recent_events.is_empty() {
            writeln!(f)?;
            writeln!(f, "Recent events:")?;
            for event in &self.recent_events {
                writeln!(
                    f,
                    "  {} {:12} {:22} {}",
                    event.timestamp.format("%H:%M:%S"),
                    event.service_name,
                    event.category.as_str(),
                    event.message
                )?;
            }
        }
        Ok(())
    }
}
