//! Exponential backoff policy for event delivery.
//!
//! Delay schedule (base=1000ms, max=30000ms):
//!
//! ```text
//! Attempt    Delay            With jitter
//! ─────────────────────────────────────────
//!    1        1s              1s - 1.1s
//!    2        2s              2s - 2.2s
//!    3        4s              4s - 4.4s
//!    4        8s              8s - 8.8s
//!    5       16s             16s - 17.6s
//!    6       30s (capped)    30s - 33s
//! ```
//!
//! Jitter is additive and uniform in `[0, 0.1 * delay)`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Jitter fraction of the capped delay.
const JITTER_FACTOR: f64 = 0.1;

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}

fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}

fn default_use_jitter() -> bool {
    true
}

/// Retry policy for one subscription.
///
/// A subscription without its own policy inherits the bus default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the initial attempt; the handler runs at most
    /// `max_retries + 1` times.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_use_jitter")]
    pub use_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            use_jitter: true,
        }
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RetryPolicy(max_retries={}, base_delay={}ms, max_delay={}ms, jitter={})",
            self.max_retries, self.base_delay_ms, self.max_delay_ms, self.use_jitter
        )
    }
}

impl RetryPolicy {
    /// The stock policy: 2 retries, 1s base, 30s cap, jitter on.
    pub fn standard() -> Self {
        Self::default()
    }

    /// Jitter-free variant of `self`, for callers that need exact delays.
    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Whether another retry is allowed after `attempt` failures.
    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }

    /// Delay before retry `attempt` (1-based after the initial failure):
    /// `min(base * 2^(attempt-1), max)`, plus jitter in `[0, 0.1 * delay)`
    /// when enabled.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let exponential = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(exponent));
        let capped = exponential.min(self.max_delay_ms);

        let millis = if self.use_jitter && capped > 0 {
            let jitter = rand::thread_rng().gen_range(0.0..JITTER_FACTOR);
            capped + (capped as f64 * jitter) as u64
        } else {
            capped
        };
        Duration::from_millis(millis)
    }

    /// All delays up to exhaustion; useful for logging a schedule.
    pub fn delay_schedule(&self) -> Vec<Duration> {
        (1..=self.max_retries).map(|n| self.delay_for(n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::standard();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.base_delay_ms, 1_000);
        assert_eq!(policy.max_delay_ms, 30_000);
        assert!(policy.use_jitter);
    }

    #[test]
    fn test_delay_doubles_without_jitter() {
        let policy = RetryPolicy {
            base_delay_ms: 100,
            max_delay_ms: 10_000,
            use_jitter: false,
            ..Default::default()
        };

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_is_capped_at_max() {
        let policy = RetryPolicy {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            use_jitter: false,
            ..Default::default()
        };

        assert_eq!(policy.delay_for(6), Duration::from_millis(30_000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(30_000));
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let policy = RetryPolicy {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            use_jitter: true,
            ..Default::default()
        };

        for attempt in 1..=6 {
            let exact = policy.clone().without_jitter().delay_for(attempt);
            for _ in 0..50 {
                let jittered = policy.delay_for(attempt);
                assert!(jittered >= exact, "jitter must never shorten the delay");
                assert!(
                    jittered < exact.mul_f64(1.1) + Duration::from_millis(1),
                    "attempt {attempt}: {jittered:?} above 1.1x {exact:?}"
                );
            }
        }
    }

    #[test]
    fn test_jitter_produces_variation() {
        let policy = RetryPolicy {
            base_delay_ms: 10_000,
            ..Default::default()
        };

        let delays: std::collections::HashSet<Duration> =
            (0..20).map(|_| policy.delay_for(1)).collect();
        assert!(delays.len() > 1, "expected jitter to vary the delay");
    }

    #[test]
    fn test_can_retry_counts_the_initial_attempt_separately() {
        let policy = RetryPolicy {
            max_retries: 2,
            ..Default::default()
        };

        assert!(policy.can_retry(1));
        assert!(policy.can_retry(2));
        assert!(!policy.can_retry(3));
    }

    #[test]
    fn test_schedule_has_one_entry_per_retry() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay_ms: 10,
            max_delay_ms: 1_000,
            use_jitter: false,
        };

        let schedule = policy.delay_schedule();
        assert_eq!(
            schedule,
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(40)
            ]
        );
    }

    #[test]
    fn test_serde_fills_defaults_for_missing_fields() {
        let policy: RetryPolicy = serde_json::from_str("{\"max_retries\": 5}").unwrap();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay_ms, 1_000);
        assert!(policy.use_jitter);
    }
}
