use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RetrievalErrorKind;

pub const DEFAULT_RETRIEVAL_LOG_CAPACITY: usize = 100;

/// One memory retrieval, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalRecord {
    pub agent_name: String,
    pub market_id: String,
    /// `None` on success.
    pub error_kind: Option<RetrievalErrorKind>,
    pub error_message: Option<String>,
    pub attempts: u32,
    pub signals_returned: usize,
    pub elapsed_ms: u64,
    pub recorded_at: DateTime<Utc>,
}

impl RetrievalRecord {
    pub fn succeeded(&self) -> bool {
        self.error_kind.is_none()
    }
}

/// Bounded, in-process history of retrievals for diagnostics.
///
/// Shared by every clone of the memory service; the oldest entry is evicted
/// once capacity is reached.
#[derive(Debug)]
pub struct RetrievalLog {
    capacity: usize,
    entries: Mutex<VecDeque<RetrievalRecord>>,
}

impl Default for RetrievalLog {
    fn default() -> Self {
        Self::new(DEFAULT_RETRIEVAL_LOG_CAPACITY)
    }
}

impl RetrievalLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, record: RetrievalRecord) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `n` entries, most recent first.
    pub fn recent(&self, n: usize) -> Vec<RetrievalRecord> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().rev().take(n).cloned().collect()
    }

    pub fn failure_count(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().filter(|r| !r.succeeded()).count()
    }

    /// Every retained entry, oldest first.
    pub fn snapshot(&self) -> Vec<RetrievalRecord> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(agent: &str, error_kind: Option<RetrievalErrorKind>) -> RetrievalRecord {
        RetrievalRecord {
            agent_name: agent.to_string(),
            market_id: "mkt-1".to_string(),
            error_kind,
            error_message: error_kind.map(|k| k.to_string()),
            attempts: 1,
            signals_returned: 0,
            elapsed_ms: 3,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let log = RetrievalLog::new(3);
        for i in 0..5 {
            log.record(record(&format!("agent-{i}"), None));
        }
        assert_eq!(log.len(), 3);
        let names: Vec<_> = log.snapshot().into_iter().map(|r| r.agent_name).collect();
        assert_eq!(names, vec!["agent-2", "agent-3", "agent-4"]);
    }

    #[test]
    fn recent_is_newest_first() {
        let log = RetrievalLog::default();
        log.record(record("first", None));
        log.record(record("second", Some(RetrievalErrorKind::Timeout)));

        let recent = log.recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].agent_name, "second");
        assert_eq!(log.recent(10).len(), 2);
    }

    #[test]
    fn counts_failures() {
        let log = RetrievalLog::default();
        log.record(record("a", None));
        log.record(record("b", Some(RetrievalErrorKind::Connection)));
        log.record(record("c", Some(RetrievalErrorKind::Unknown)));
        assert_eq!(log.failure_count(), 2);
        assert!(!log.is_empty());
        assert_eq!(log.capacity(), DEFAULT_RETRIEVAL_LOG_CAPACITY);
    }
}
