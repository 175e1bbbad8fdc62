use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mace_models::config::MemoryConfig;
use mace_models::signal::AgentMemoryContext;
use mace_models::signal_schema::{SignalQuery, SignalRow};
use mace_store::SignalStore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::{RetrievalError, RetrievalErrorKind};
use crate::normalize::normalize_row;
use crate::retry::{classify_store_error, RetryPolicy};
use crate::telemetry::{RetrievalLog, RetrievalRecord};

/// No agent is ever handed more than this many historical signals.
pub const MAX_SIGNALS_HARD_CAP: usize = 5;

/// Fetches each agent's own recent signals for a market.
///
/// Retrieval never fails from the caller's point of view: every error is
/// classified, retried when transient, logged, and finally replaced by an
/// empty [`AgentMemoryContext`]. Cloning is cheap and clones share the store
/// and the retrieval log.
#[derive(Clone)]
pub struct MemoryRetrievalService {
    store: Arc<dyn SignalStore>,
    retry: RetryPolicy,
    query_timeout: Duration,
    default_limit: usize,
    log: Arc<RetrievalLog>,
}

impl MemoryRetrievalService {
    pub fn new(store: Arc<dyn SignalStore>) -> Self {
        Self::from_config(store, &MemoryConfig::default(), Arc::new(RetrievalLog::default()))
    }

    pub fn from_config(
        store: Arc<dyn SignalStore>,
        config: &MemoryConfig,
        log: Arc<RetrievalLog>,
    ) -> Self {
        Self {
            store,
            retry: RetryPolicy::from(config),
            query_timeout: Duration::from_millis(config.query_timeout_ms),
            default_limit: clamp_limit(config.max_signals_per_agent),
            log,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    pub fn log(&self) -> &Arc<RetrievalLog> {
        &self.log
    }

    /// The agent's most recent valid signals for `market_id`, newest first.
    ///
    /// `limit` is clamped to `1..=MAX_SIGNALS_HARD_CAP`.
    pub async fn get_agent_memory(
        &self,
        agent_name: &str,
        market_id: &str,
        limit: usize,
    ) -> AgentMemoryContext {
        let start = Instant::now();
        let limit = clamp_limit(limit);

        let (context, error, attempts) = match self.retrieve(agent_name, market_id, limit).await {
            Ok((context, attempts)) => {
                debug!(
                    agent = %agent_name,
                    market = %market_id,
                    signals = context.signals.len(),
                    attempts,
                    "Memory retrieved"
                );
                (context, None, attempts)
            }
            Err(err) => {
                warn!(
                    agent = %agent_name,
                    market = %market_id,
                    error_kind = %err.kind,
                    attempts = err.attempts,
                    error = %err.message,
                    "Memory retrieval failed, continuing without history"
                );
                let attempts = err.attempts;
                (AgentMemoryContext::empty(agent_name, market_id), Some(err), attempts)
            }
        };

        self.log.record(RetrievalRecord {
            agent_name: agent_name.to_string(),
            market_id: market_id.to_string(),
            error_kind: error.as_ref().map(|e| e.kind),
            error_message: error.map(|e| e.message),
            attempts,
            signals_returned: context.signals.len(),
            elapsed_ms: start.elapsed().as_millis() as u64,
            recorded_at: Utc::now(),
        });

        context
    }

    /// Retrieve memory for every agent concurrently. One agent's failure (or
    /// panic) never affects another's result.
    pub async fn get_all_agent_memories<S: AsRef<str>>(
        &self,
        market_id: &str,
        agent_names: &[S],
        limit: usize,
    ) -> HashMap<String, AgentMemoryContext> {
        let mut handles = Vec::with_capacity(agent_names.len());
        for agent in agent_names {
            let agent = agent.as_ref().to_string();
            let service = self.clone();
            let market = market_id.to_string();
            let task_agent = agent.clone();
            handles.push((
                agent,
                tokio::spawn(async move {
                    service.get_agent_memory(&task_agent, &market, limit).await
                }),
            ));
        }

        let mut memories = HashMap::with_capacity(handles.len());
        for (agent, handle) in handles {
            let context = match handle.await {
                Ok(context) => context,
                Err(e) => {
                    error!(agent = %agent, market = %market_id, error = %e, "Memory retrieval task panicked");
                    AgentMemoryContext::empty(&agent, market_id)
                }
            };
            memories.insert(agent, context);
        }
        memories
    }

    async fn retrieve(
        &self,
        agent_name: &str,
        market_id: &str,
        limit: usize,
    ) -> Result<(AgentMemoryContext, u32), RetrievalError> {
        if agent_name.trim().is_empty() {
            return Err(RetrievalError::new(
                RetrievalErrorKind::Validation,
                "agent name must not be empty",
            ));
        }
        if market_id.trim().is_empty() {
            return Err(RetrievalError::new(
                RetrievalErrorKind::Validation,
                "market id must not be empty",
            ));
        }

        let query = SignalQuery::new(agent_name, market_id, limit);
        let (rows, attempts) = self.fetch_with_retry(&query).await?;

        let retrieved_at = Utc::now();
        let mut signals = Vec::with_capacity(rows.len());
        for row in rows {
            match normalize_row(row, retrieved_at) {
                Ok(signal) => signals.push(signal),
                Err(reason) => {
                    warn!(agent = %agent_name, market = %market_id, reason = %reason, "Dropping invalid signal row");
                }
            }
        }
        signals.truncate(limit);

        Ok((AgentMemoryContext::new(agent_name, market_id, signals), attempts))
    }

    async fn fetch_with_retry(&self, query: &SignalQuery) -> Result<(Vec<SignalRow>, u32), RetrievalError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once(query).await {
                Ok(rows) => return Ok((rows, attempt)),
                Err(err) if err.kind.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    debug!(
                        agent = %query.agent_name,
                        market = %query.market_id,
                        attempt,
                        error_kind = %err.kind,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying memory query"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err.after_attempts(attempt)),
            }
        }
    }

    /// One query raced against the query timeout. The store's cancellation
    /// token fires when this returns, whichever side won.
    async fn fetch_once(&self, query: &SignalQuery) -> Result<Vec<SignalRow>, RetrievalError> {
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();

        tokio::select! {
            result = self.store.recent_signals(query, cancel.clone()) => {
                result.map_err(|e| RetrievalError::new(classify_store_error(&e), e.to_string()))
            }
            _ = tokio::time::sleep(self.query_timeout) => Err(RetrievalError::new(
                RetrievalErrorKind::Timeout,
                format!("query exceeded {}ms", self.query_timeout.as_millis()),
            )),
        }
    }
}

fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_SIGNALS_HARD_CAP)
}
