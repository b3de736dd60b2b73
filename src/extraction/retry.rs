//! Retry policy consumed by the batch fetcher

use std::time::Duration;

use crate::error::{Error, Result};
use crate::extraction::fetcher::FetchError;

/// What to do after a failed fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Back off exponentially; counts against `max_retries`.
    Retry,
    /// Wait the fixed rate-limit cool-down; does not count against `max_retries`.
    Cooldown,
    /// Give up immediately.
    Fatal,
}

/// Maps a fetch error onto a [`RetryDecision`].
pub type Classifier = fn(&FetchError) -> RetryDecision;

/// HTTP 429 cools down, everything else is retried with backoff.
pub fn default_classifier(error: &FetchError) -> RetryDecision {
    match error {
        FetchError::RateLimited => RetryDecision::Cooldown,
        _ => RetryDecision::Retry,
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Counted attempts per offset before giving up
    pub max_retries: u32,
    /// Backoff before retry `n` (0-based) is `base_delay * 2^n`
    pub base_delay: Duration,
    /// Fixed wait after a rate-limit response
    pub rate_limit_cooldown: Duration,
    /// Pause after every successful, non-empty batch
    pub courtesy_delay: Duration,
    /// Upper bound on consecutive cool-downs for one offset; any other failure in between
    /// starts the count again. `None` waits forever
    pub max_rate_limit_waits: Option<u32>,
    pub classify: Classifier,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(10),
            rate_limit_cooldown: Duration::from_secs(60),
            courtesy_delay: Duration::from_secs(5),
            max_rate_limit_waits: None,
            classify: default_classifier,
        }
    }
}

impl RetryPolicy {
    /// Same classification and budget as the default, without any waiting.
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            rate_limit_cooldown: Duration::ZERO,
            courtesy_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_max_rate_limit_waits(mut self, waits: u32) -> Self {
        self.max_rate_limit_waits = Some(waits);
        self
    }

    pub fn with_classifier(mut self, classify: Classifier) -> Self {
        self.classify = classify;
        self
    }

    pub fn classify(&self, error: &FetchError) -> RetryDecision {
        (self.classify)(error)
    }

    /// Wait before retry number `retry` (0-based).
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(Error::Config("max_retries must be at least 1".to_string()));
        }
        Ok(())
    }
}
