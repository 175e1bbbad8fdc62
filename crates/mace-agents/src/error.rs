use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent invocation error: {0}")]
    Invocation(String),

    #[error("Agent produced an invalid signal: {0}")]
    InvalidSignal(String),

    #[error("Agent timed out after {0} seconds")]
    Timeout(u64),

    #[error("Budget error: {0}")]
    Budget(#[from] mace_budget::BudgetError),

    #[error("Signal store error: {0}")]
    Store(#[from] mace_store::StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a memory retrieval attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetrievalErrorKind {
    #[serde(rename = "CONNECTION_ERROR")]
    Connection,
    #[serde(rename = "TIMEOUT_ERROR")]
    Timeout,
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    #[serde(rename = "RATE_LIMIT_ERROR")]
    RateLimit,
    #[serde(rename = "DATA_CORRUPTION_ERROR")]
    DataCorruption,
    #[serde(rename = "UNKNOWN_ERROR")]
    Unknown,
}

impl RetrievalErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalErrorKind::Connection => "CONNECTION_ERROR",
            RetrievalErrorKind::Timeout => "TIMEOUT_ERROR",
            RetrievalErrorKind::Validation => "VALIDATION_ERROR",
            RetrievalErrorKind::RateLimit => "RATE_LIMIT_ERROR",
            RetrievalErrorKind::DataCorruption => "DATA_CORRUPTION_ERROR",
            RetrievalErrorKind::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Only transient infrastructure failures are worth another attempt.
    /// A timed-out query is not retried: the caller has already waited the
    /// full query budget once.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetrievalErrorKind::Connection | RetrievalErrorKind::RateLimit
        )
    }
}

impl fmt::Display for RetrievalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified retrieval failure. Never escapes the memory service; it is
/// logged, recorded, and replaced by an empty memory context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message} (after {attempts} attempt(s))")]
pub struct RetrievalError {
    pub kind: RetrievalErrorKind,
    pub message: String,
    /// Storage queries issued before giving up. Zero for rejected input.
    pub attempts: u32,
}

impl RetrievalError {
    pub fn new(kind: RetrievalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            attempts: 0,
        }
    }

    pub fn after_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}
