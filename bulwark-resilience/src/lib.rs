//! Resilience patterns for Bulwark
//!
//! This crate provides the failure taxonomy, retry with exponential backoff,
//! per-service circuit breakers, background health monitoring, and the
//! invoker that composes them around calls to remote services.

pub mod backoff;
pub mod circuit_breaker;
pub mod clock;
pub mod error;
pub mod health;
pub mod invoker;
pub mod retry;

// Re-export commonly used types
pub use backoff::BackoffCalculator;
pub use circuit_breaker::{
    BreakerEvent, BreakerSnapshot, BreakerState, CircuitBreaker, CircuitBreakerBuilder,
    CircuitBreakerConfig, CircuitState, Phase,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{
    classify, CircuitOpenError, Classified, ErrorClass, FailureKind, OutcomeCategory,
    PermanentKind, ResilienceError, ServiceError, TransientKind,
};
pub use health::{probe_fn, FnProbe, HealthConfig, HealthMonitor, HealthProbe, ProbeError};
pub use invoker::{InvokerBuilder, ResilientInvoker};
pub use retry::{Retried, RetryExecutor, RetryPolicy};
