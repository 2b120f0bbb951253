//! Retry policy applied by [`Topic`](crate::Topic) to retryable send failures.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff duration in milliseconds
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Maximum backoff duration in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    5000
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            base_backoff_ms,
            max_backoff_ms,
        }
    }

    /// A policy that never retries
    pub fn disabled() -> Self {
        Self::new(0, 0, 0)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(
            default_max_retries(),
            default_base_backoff_ms(),
            default_max_backoff_ms(),
        )
    }
}

/// Exponential backoff with jitter
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    config: RetryConfig,
}

impl RetryStrategy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Whether another attempt is allowed after `attempt` retries
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.config.max_retries
    }

    /// Backoff before retry number `attempt` (1-based).
    ///
    /// Doubles from the base, is capped at the maximum, and carries up to
    /// 25% random jitter on top of the capped value.
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let backoff = self
            .config
            .base_backoff_ms
            .saturating_mul(1u64 << exp)
            .min(self.config.max_backoff_ms);

        let jitter = if backoff >= 4 {
            rand::rng().random_range(0..=backoff / 4)
        } else {
            0
        };

        Duration::from_millis(backoff + jitter)
    }
}
