//! Delay between delivery attempts.
//!
//! The dispatcher asks its [`Backoff`] how long to wait after a failed attempt,
//! which lets tests plug in [`NoBackoff`] instead of sleeping.

use std::time::Duration;

use rand::Rng;

/// Computes the wait after failed attempt `attempt` (0-indexed).
pub trait Backoff: Send + Sync {
    fn delay(&self, attempt: u32) -> Duration;
}

/// `base * 2^attempt + U(0, jitter)`.
///
/// With the defaults (1s base, 1s jitter) the waits are roughly 1-2s, 2-3s,
/// 4-5s, 8-9s.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub jitter: Duration,
    /// Upper bound on the exponential part
    pub max_delay: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            jitter: Duration::from_secs(1),
            max_delay: Duration::from_secs(300),
        }
    }
}

impl ExponentialBackoff {
    /// Delay without the random component.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base.saturating_mul(factor).min(self.max_delay)
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let jitter = self.jitter.mul_f64(rand::thread_rng().r#gen::<f64>());
        self.base_delay(attempt) + jitter
    }
}

/// Retry immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl Backoff for NoBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}
