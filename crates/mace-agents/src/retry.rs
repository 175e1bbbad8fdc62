use std::time::Duration;

use mace_models::config::MemoryConfig;
use mace_store::StoreError;

use crate::error::RetrievalErrorKind;

/// Exponential backoff schedule for storage queries.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&MemoryConfig::default())
    }
}

impl From<&MemoryConfig> for RetryPolicy {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            max_attempts: config.retry_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: config.backoff_multiplier,
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the attempt following failed attempt number `attempt`
    /// (1-based): `min(initial * multiplier^(attempt - 1), max)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        // min() also absorbs an overflow to infinity or NaN.
        let capped = secs.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }
}

const CONNECTION_MARKERS: &[&str] = &[
    "connection refused",
    "econnrefused",
    "not found",
    "enotfound",
    "timed out",
    "etimedout",
    "unable to open database",
    "database is locked",
    "08001",
    "08003",
    "08006",
    "57p01",
];

const RATE_LIMIT_MARKERS: &[&str] = &["429", "rate limit", "too many requests"];

const CORRUPTION_MARKERS: &[&str] = &["malformed", "invalid", "corrupt"];

/// Classify a raw storage error message by substring.
pub fn classify_message(message: &str) -> RetrievalErrorKind {
    let lower = message.to_lowercase();
    let matches_any = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if matches_any(CONNECTION_MARKERS) {
        RetrievalErrorKind::Connection
    } else if matches_any(RATE_LIMIT_MARKERS) {
        RetrievalErrorKind::RateLimit
    } else if matches_any(CORRUPTION_MARKERS) {
        RetrievalErrorKind::DataCorruption
    } else {
        RetrievalErrorKind::Unknown
    }
}

pub fn classify_store_error(err: &StoreError) -> RetrievalErrorKind {
    match err {
        StoreError::Cancelled => RetrievalErrorKind::Timeout,
        StoreError::Json(_) => RetrievalErrorKind::DataCorruption,
        other => classify_message(&other.to_string()),
    }
}
