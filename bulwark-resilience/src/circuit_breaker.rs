//! Circuit breaker pattern implementation
//!
//! The state machine lives in [`BreakerState::next`], a pure function of the
//! current state and an event. [`CircuitBreaker`] wraps it in a mutex and a
//! [`Clock`]; the mutex is held only while a transition is computed, never
//! while the protected operation runs.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::CircuitOpenError;

/// Externally visible circuit state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed, requests pass through normally
    Closed,
    /// Circuit is open, requests are rejected
    Open,
    /// Circuit is probing whether the service recovered
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,

    /// Time to wait in OPEN before admitting a probe
    #[serde(with = "humantime_serde")]
    pub open_timeout: Duration,

    /// Successes in HALF_OPEN needed to close the circuit
    pub half_open_required_successes: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            open_timeout: Duration::from_secs(60),
            half_open_required_successes: 1,
        }
    }
}

/// Phase of the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Closed,
    Open { since: Instant },
    HalfOpen { successes: u32 },
}

/// Input to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerEvent {
    Success,
    Failure { at: Instant },
    /// Time check performed on every state query or call attempt
    Elapsed { now: Instant },
}

/// Complete breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerState {
    pub phase: Phase,
    /// Consecutive qualifying failures since the last reset to 0
    pub failure_count: u32,
    pub last_failure: Option<Instant>,
}

impl Default for BreakerState {
    fn default() -> Self {
        Self::closed()
    }
}

impl BreakerState {
    pub fn closed() -> Self {
        Self {
            phase: Phase::Closed,
            failure_count: 0,
            last_failure: None,
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        match self.phase {
            Phase::Closed => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Successes observed in HALF_OPEN; zero in any other phase
    pub fn success_count(&self) -> u32 {
        match self.phase {
            Phase::HalfOpen { successes } => successes,
            _ => 0,
        }
    }

    /// Compute the state that follows `event`
    pub fn next(self, event: BreakerEvent, config: &CircuitBreakerConfig) -> Self {
        match event {
            BreakerEvent::Elapsed { now } => match self.phase {
                Phase::Open { since } if now.saturating_duration_since(since) >= config.open_timeout => {
                    Self {
                        phase: Phase::HalfOpen { successes: 0 },
                        ..self
                    }
                }
                _ => self,
            },
            BreakerEvent::Success => match self.phase {
                Phase::Closed => Self {
                    failure_count: 0,
                    ..self
                },
                Phase::HalfOpen { successes } => {
                    let successes = successes.saturating_add(1);
                    if successes >= config.half_open_required_successes.max(1) {
                        Self {
                            phase: Phase::Closed,
                            failure_count: 0,
                            ..self
                        }
                    } else {
                        Self {
                            phase: Phase::HalfOpen { successes },
                            ..self
                        }
                    }
                }
                // Late success from a call admitted before the circuit opened
                Phase::Open { .. } => self,
            },
            BreakerEvent::Failure { at } => {
                let failure_count = self.failure_count.saturating_add(1);
                let phase = match self.phase {
                    Phase::Closed if failure_count < config.failure_threshold.max(1) => {
                        Phase::Closed
                    }
                    _ => Phase::Open { since: at },
                };
                Self {
                    phase,
                    failure_count,
                    last_failure: Some(at),
                }
            }
        }
    }
}

/// Point-in-time view of a breaker, for status reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub service: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    /// Time since the most recent qualifying failure
    #[serde(with = "humantime_serde")]
    pub last_failure_age: Option<Duration>,
}

/// Thread-safe circuit breaker for a single service
#[derive(Clone)]
pub struct CircuitBreaker {
    service: Arc<str>,
    config: Arc<CircuitBreakerConfig>,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<BreakerState>>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("service", &self.service)
            .field("config", &self.config)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    pub fn new(service: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self::with_clock(service, config, Arc::new(SystemClock))
    }

    /// Create a breaker that reads time from `clock`
    pub fn with_clock(
        service: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let service: String = service.into();
        Self {
            service: service.into(),
            config: Arc::new(config),
            clock,
            state: Arc::new(Mutex::new(BreakerState::closed())),
        }
    }

    /// Create with default configuration
    pub fn with_defaults(service: impl Into<String>) -> Self {
        Self::new(service, CircuitBreakerConfig::default())
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state, after the lazy open-timeout check
    pub fn state(&self) -> CircuitState {
        let mut state = self.state.lock();
        self.refresh(&mut state);
        state.circuit_state()
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let mut state = self.state.lock();
        self.refresh(&mut state);
        let now = self.clock.now();
        BreakerSnapshot {
            service: self.service.to_string(),
            state: state.circuit_state(),
            failure_count: state.failure_count,
            success_count: state.success_count(),
            last_failure_age: state.last_failure.map(|at| now.saturating_duration_since(at)),
        }
    }

    /// Decide whether a call may proceed
    pub fn admit(&self) -> Result<(), CircuitOpenError> {
        let mut state = self.state.lock();
        self.refresh(&mut state);
        match state.phase {
            Phase::Open { since } => {
                let elapsed = self.clock.now().saturating_duration_since(since);
                Err(CircuitOpenError {
                    service: self.service.to_string(),
                    retry_in: self.config.open_timeout.saturating_sub(elapsed),
                })
            }
            Phase::Closed | Phase::HalfOpen { .. } => Ok(()),
        }
    }

    /// Record a successful operation
    pub fn record_success(&self) {
        self.apply(BreakerEvent::Success);
    }

    /// Record a failed operation
    pub fn record_failure(&self) {
        let at = self.clock.now();
        self.apply(BreakerEvent::Failure { at });
    }

    /// Force the breaker back to CLOSED with zeroed counters
    pub fn reset(&self) {
        let mut state = self.state.lock();
        *state = BreakerState::closed();
        info!(service = %self.service, "circuit breaker manually reset");
    }

    /// Run `operation` behind the breaker.
    ///
    /// Rejects with [`CircuitOpenError`] without calling `operation` while the
    /// circuit is open. Any `Err` from the operation counts as one failure.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CircuitOpenError>,
    {
        self.admit()?;

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(error) => {
                self.record_failure();
                Err(error)
            }
        }
    }

    fn refresh(&self, state: &mut BreakerState) {
        let now = self.clock.now();
        self.transition(state, BreakerEvent::Elapsed { now });
    }

    fn apply(&self, event: BreakerEvent) {
        let mut state = self.state.lock();
        self.refresh(&mut state);
        self.transition(&mut state, event);
    }

    fn transition(&self, state: &mut BreakerState, event: BreakerEvent) {
        let before = state.circuit_state();
        *state = state.next(event, &self.config);
        let after = state.circuit_state();

        if before == after {
            return;
        }
        match after {
            CircuitState::Open if before == CircuitState::HalfOpen => {
                warn!(service = %self.service, "circuit breaker reopened from HALF_OPEN");
            }
            CircuitState::Open => warn!(
                service = %self.service,
                failures = state.failure_count,
                "circuit breaker opened"
            ),
            CircuitState::HalfOpen => {
                info!(service = %self.service, "circuit breaker transitioning to HALF_OPEN")
            }
            CircuitState::Closed => {
                info!(service = %self.service, "circuit breaker closed after successful recovery")
            }
        }
    }
}

/// Builder for circuit breakers
pub struct CircuitBreakerBuilder {
    service: String,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
}

impl CircuitBreakerBuilder {
    /// Create a new builder with default config
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            config: CircuitBreakerConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Set failure threshold
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    /// Set timeout before attempting recovery
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.config.open_timeout = timeout;
        self
    }

    /// Set successes required in HALF_OPEN before closing
    pub fn half_open_required_successes(mut self, successes: u32) -> Self {
        self.config.half_open_required_successes = successes;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the circuit breaker
    pub fn build(self) -> CircuitBreaker {
        CircuitBreaker::with_clock(self.service, self.config, self.clock)
    }
}
