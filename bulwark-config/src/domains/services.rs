//! Remote service configuration

use bulwark_services::{LanguageModelConfig, SpeechClientConfig};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, validate_url, Validatable};

/// How the call agent reaches its providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    /// Real HTTP providers
    Live,
    /// Scripted in-process fakes
    #[default]
    Simulated,
}

impl FromStr for ServiceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" => Ok(ServiceMode::Live),
            "simulated" => Ok(ServiceMode::Simulated),
            _ => Err(format!("Invalid service mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub mode: ServiceMode,
    pub speech: SpeechClientConfig,
    pub llm: LanguageModelConfig,
}

impl Validatable for ServicesConfig {
    fn validate(&self) -> ConfigResult<()> {
        let domain = self.domain_name();
        validate_url(&self.speech.url, "speech.url", domain)?;
        validate_url(&self.speech.health_url, "speech.health_url", domain)?;
        validate_required_string(&self.speech.default_voice_id, "speech.default_voice_id", domain)?;
        validate_url(&self.llm.url, "llm.url", domain)?;
        validate_url(&self.llm.health_url, "llm.health_url", domain)?;
        validate_required_string(&self.llm.model, "llm.model", domain)?;

        if self.mode == ServiceMode::Live {
            if self.speech.api_key.as_deref().map_or(true, str::is_empty) {
                return Err(self.validation_error("speech.api_key is required in live mode"));
            }
            if self.llm.api_key.as_deref().map_or(true, str::is_empty) {
                return Err(self.validation_error("llm.api_key is required in live mode"));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "services"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_mode_requires_keys() {
        let mut config = ServicesConfig {
            mode: ServiceMode::Live,
            ..ServicesConfig::default()
        };
        assert!(config.validate().is_err());

        config.speech.api_key = Some("xi".to_string());
        config.llm.api_key = Some("sk".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_simulated_mode_needs_no_keys() {
        assert!(ServicesConfig::default().validate().is_ok());
        assert_eq!("LIVE".parse::<ServiceMode>().unwrap(), ServiceMode::Live);
    }
}
