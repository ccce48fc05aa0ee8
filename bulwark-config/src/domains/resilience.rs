//! Validation for the retry, circuit breaker and health settings

use bulwark_resilience::{CircuitBreakerConfig, HealthConfig, RetryPolicy};

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};

impl Validatable for RetryPolicy {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.max_attempts, "max_attempts", self.domain_name())?;

        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(self.validation_error(format!(
                "backoff_multiplier must be at least 1.0, got {}",
                self.backoff_multiplier
            )));
        }

        if let Some(max_delay) = self.max_delay {
            if max_delay < self.initial_delay {
                return Err(self.validation_error(
                    "max_delay must be greater than or equal to initial_delay",
                ));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "retry"
    }
}

impl Validatable for CircuitBreakerConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.failure_threshold, "failure_threshold", self.domain_name())?;
        validate_positive(
            self.half_open_required_successes,
            "half_open_required_successes",
            self.domain_name(),
        )?;
        if self.open_timeout.is_zero() {
            return Err(self.validation_error("open_timeout must be greater than 0"));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "circuit_breaker"
    }
}

impl Validatable for HealthConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.poll_interval.is_zero() {
            return Err(self.validation_error("poll_interval must be greater than 0"));
        }
        if self.probe_timeout.is_zero() {
            return Err(self.validation_error("probe_timeout must be greater than 0"));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "health"
    }
}
