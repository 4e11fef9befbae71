//! Redial policy with jittered exponential back-off.

use std::time::Duration;

use tg_domain::config::ControllerConfig;

/// Controls how the controller link redials after the connection drops.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    /// Delay before the first redial.
    pub initial_delay: Duration,
    /// Maximum delay between attempts (cap).
    pub max_delay: Duration,
    /// Multiplier applied after each failed attempt.
    pub backoff_factor: f64,
    /// Consecutive failed dials before giving up.  `0` means unlimited.
    pub max_attempts: u32,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::from_config(&ControllerConfig::default())
    }
}

impl ReconnectBackoff {
    pub fn from_config(cfg: &ControllerConfig) -> Self {
        Self {
            initial_delay: cfg.initial_delay(),
            max_delay: cfg.max_delay(),
            backoff_factor: cfg.backoff_factor,
            max_attempts: cfg.max_attempts,
        }
    }

    /// Compute the delay for the given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64;
        let delay_ms = base_ms * self.backoff_factor.powi(attempt as i32);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        // ~25% jitter so a controller restart doesn't get every worker back
        // in the same instant.
        let jitter = capped_ms * 0.25 * pseudo_random_fraction(attempt);
        Duration::from_millis((capped_ms + jitter) as u64)
    }

    /// Whether `failures` consecutive failed dials exhaust the policy.
    pub fn should_give_up(&self, failures: u32) -> bool {
        self.max_attempts > 0 && failures >= self.max_attempts
    }
}

/// Deterministic fraction in [0, 1) from the attempt number.  Only needs to
/// spread workers apart, not be unpredictable.
fn pseudo_random_fraction(attempt: u32) -> f64 {
    let hash = attempt.wrapping_mul(2654435761); // Knuth multiplicative hash
    (hash as f64) / (u32::MAX as f64)
}
