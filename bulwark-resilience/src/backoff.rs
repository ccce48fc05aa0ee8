//! Exponential backoff delays for retry policies

use rand::Rng;
use std::time::Duration;

/// Backoff delay calculator
///
/// Delay for attempt `n` (1-indexed) is `initial_delay * multiplier^(n-1)`,
/// optionally capped and jittered.
#[derive(Debug, Clone)]
pub struct BackoffCalculator {
    initial_delay: Duration,
    multiplier: f64,
    max_delay: Option<Duration>,
    jitter: bool,
}

impl BackoffCalculator {
    /// Create a new backoff calculator
    pub fn new(
        initial_delay: Duration,
        multiplier: f64,
        max_delay: Option<Duration>,
        jitter: bool,
    ) -> Self {
        Self {
            initial_delay,
            multiplier,
            max_delay,
            jitter,
        }
    }

    /// Calculate delay for a specific attempt (1-indexed)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.calculate_base_delay(attempt);
        let capped_delay = match self.max_delay {
            Some(max) => base_delay.min(max),
            None => base_delay,
        };

        if self.jitter {
            add_jitter(capped_delay)
        } else {
            capped_delay
        }
    }

    /// Iterate over the delays that follow each failed attempt
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..).map(move |attempt| self.calculate_delay(attempt))
    }

    fn calculate_base_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

// ±20% jitter
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor = rng.gen_range(0.8..1.2);
    Duration::from_nanos((delay.as_nanos() as f64 * jitter_factor) as u64)
}
