//! Domain-specific configuration modules

pub mod alerts;
pub mod logging;
pub mod resilience;
pub mod services;

use bulwark_logging::LoggingConfig;
use bulwark_resilience::{CircuitBreakerConfig, HealthConfig, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::Validatable;

/// Main Bulwark configuration combining all domains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BulwarkConfig {
    /// Retry policy shared by every service
    pub retry: RetryPolicy,

    /// Settings for the per-service circuit breakers
    pub circuit_breaker: CircuitBreakerConfig,

    /// Background health monitoring
    pub health: HealthConfig,

    pub logging: LoggingConfig,

    pub alerts: alerts::AlertsConfig,

    pub services: services::ServicesConfig,
}

impl BulwarkConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.retry.validate()?;
        self.circuit_breaker.validate()?;
        self.health.validate()?;
        self.logging.validate()?;
        self.alerts.validate()?;
        self.services.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = BulwarkConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
