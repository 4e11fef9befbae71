use serde::{Deserialize, Serialize};
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Controller link
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Reconnect policy for the control-plane link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Delay before the first redial after the link drops.
    #[serde(default = "d_1000")]
    pub initial_delay_ms: u64,

    /// Cap on the delay between redials.
    #[serde(default = "d_60000")]
    pub max_delay_ms: u64,

    /// Multiplier applied after each failed attempt.
    #[serde(default = "d_2")]
    pub backoff_factor: f64,

    /// Consecutive failed dials before giving up.  `0` means never.
    #[serde(default)]
    pub max_attempts: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            backoff_factor: 2.0,
            max_attempts: 0,
        }
    }
}

impl ControllerConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

fn d_1000() -> u64 {
    1_000
}
fn d_60000() -> u64 {
    60_000
}
fn d_2() -> f64 {
    2.0
}
