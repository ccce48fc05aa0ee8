use bulwark_logging::LoggingConfig;

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};

impl Validatable for LoggingConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.level, "level", self.domain_name())?;
        validate_positive(self.memory_capacity, "memory_capacity", self.domain_name())?;

        if let Some(path) = &self.event_log {
            if path.as_os_str().is_empty() {
                return Err(self.validation_error("event_log path cannot be empty"));
            }
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "logging"
    }
}
