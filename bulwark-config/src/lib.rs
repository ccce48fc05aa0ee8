//! Domain-driven configuration management for Bulwark
//!
//! This crate provides typed configuration split by functional domain
//! (retry, circuit breaker, health, logging, alerts, services), with
//! validation, defaults, YAML loading and environment variable overrides.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    alerts::AlertsConfig,
    services::{ServiceMode, ServicesConfig},
    BulwarkConfig,
};
