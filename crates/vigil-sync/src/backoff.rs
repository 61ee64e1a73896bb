//! Reconnect delay policy and jitter helpers.

use std::time::Duration;

use vigil_config::ReconnectConfig;

/// Reconnect delay policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for the computed delay.
    pub max_delay: Duration,
    /// Exponential backoff multiplier. `1.0` gives a fixed delay.
    pub multiplier: f64,
    /// Add up to 10% extra delay.
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: config.multiplier,
            jitter: config.jitter,
        }
    }
}

impl ReconnectPolicy {
    /// Fixed delay, no jitter.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
            jitter: false,
        }
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// Never shorter than `base_delay`: the cap only applies above it and
    /// jitter only adds.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as f64;
        let multiplier = if self.multiplier.is_finite() && self.multiplier >= 1.0 {
            self.multiplier
        } else {
            1.0
        };
        let delay = base * multiplier.powi(attempt.min(64) as i32);
        let delay = delay.min(self.max_delay.as_millis() as f64).max(base);

        let delay_ms = if self.jitter {
            delay + rand_unit() * delay * 0.1
        } else {
            delay
        };

        Duration::from_millis(delay_ms as u64)
    }
}

/// Random duration in `[0, max)`.
pub fn jitter_up_to(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    Duration::from_millis((rand_unit() * max.as_millis() as f64) as u64)
}

/// Uniform value in `[0, 1)`.
///
/// Seeded from system time and a per-process draw counter, so draws taken
/// within the same microsecond still differ.
fn rand_unit() -> f64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::SystemTime;

    static DRAWS: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let draw = DRAWS.fetch_add(1, Ordering::Relaxed);
    let bits = splitmix64(nanos ^ draw.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    (bits >> 11) as f64 / (1u64 << 53) as f64
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}
