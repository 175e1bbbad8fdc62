//! Scripted stores, agents and sinks for exercising the memory service and
//! the analysis engine without a database or an LLM.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mace_budget::usage::{record_usage, UsageParams};
use mace_models::agent_message::{AgentOutput, AgentRequest};
use mace_models::evolution::EvolutionEvent;
use mace_models::signal::{AgentMemoryContext, AgentSignal, Direction};
use mace_models::signal_schema::{SignalQuery, SignalRow};
use mace_models::usage::{Provider, UsageRecord};
use mace_store::{SignalStore, StoreError};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use crate::agent::SignalAgent;
use crate::error::AgentError;
use crate::evolution::EvolutionSink;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// A well-formed SQL-style row created `minutes_ago` minutes in the past.
pub fn signal_row(
    agent: &str,
    market: &str,
    minutes_ago: i64,
    direction: &str,
    fair_probability: f64,
) -> SignalRow {
    SignalRow {
        agent_name: agent.to_string(),
        market_id: market.to_string(),
        direction: Some(direction.to_string()),
        fair_probability: Some(fair_probability),
        confidence: Some(0.7),
        key_drivers: Some(serde_json::Value::String(
            r#"["order flow","volume"]"#.to_string(),
        )),
        metadata: Some(serde_json::Value::String("{}".to_string())),
        created_at: Some((Utc::now() - chrono::Duration::minutes(minutes_ago)).to_rfc3339()),
    }
}

/// What a [`ScriptedStore`] does for one call.
#[derive(Debug, Clone)]
pub enum StoreBehavior {
    Rows(Vec<SignalRow>),
    /// Fails with `StoreError::Unavailable(message)`.
    Fail(String),
    /// Never completes; the cancellation is observed and counted.
    Hang,
    Panic,
}

/// A signal store whose responses are scripted per agent.
///
/// Each agent's script is consumed in order; once exhausted (or for agents
/// without a script) the fallback behavior is used.
pub struct ScriptedStore {
    fallback: StoreBehavior,
    scripts: Mutex<HashMap<String, VecDeque<StoreBehavior>>>,
    calls: Mutex<HashMap<String, u32>>,
    limits: Mutex<Vec<usize>>,
    released: Arc<AtomicUsize>,
}

impl ScriptedStore {
    pub fn new(fallback: StoreBehavior) -> Self {
        Self {
            fallback,
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            limits: Mutex::new(Vec::new()),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn script(self, agent: &str, behaviors: Vec<StoreBehavior>) -> Self {
        lock(&self.scripts).insert(agent.to_string(), behaviors.into());
        self
    }

    pub fn calls(&self, agent: &str) -> u32 {
        lock(&self.calls).get(agent).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        lock(&self.calls).values().sum()
    }

    /// The `limit` of every query received, in arrival order.
    pub fn limits(&self) -> Vec<usize> {
        lock(&self.limits).clone()
    }

    /// Hanging queries whose cancellation token has fired.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn next_behavior(&self, agent: &str) -> StoreBehavior {
        lock(&self.scripts)
            .get_mut(agent)
            .and_then(|script| script.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl SignalStore for ScriptedStore {
    async fn recent_signals(
        &self,
        query: &SignalQuery,
        cancel: CancellationToken,
    ) -> Result<Vec<SignalRow>, StoreError> {
        *lock(&self.calls)
            .entry(query.agent_name.clone())
            .or_insert(0) += 1;
        lock(&self.limits).push(query.limit);

        match self.next_behavior(&query.agent_name) {
            StoreBehavior::Rows(mut rows) => {
                rows.truncate(query.limit);
                Ok(rows)
            }
            StoreBehavior::Fail(message) => Err(StoreError::Unavailable(message)),
            StoreBehavior::Hang => {
                let released = Arc::clone(&self.released);
                tokio::spawn(async move {
                    cancel.cancelled().await;
                    released.fetch_add(1, Ordering::SeqCst);
                });
                std::future::pending().await
            }
            StoreBehavior::Panic => panic!("scripted store panic for {}", query.agent_name),
        }
    }
}

/// A signal agent returning a canned signal, optionally after a delay.
pub struct MockAgent {
    pub name: String,
    pub direction: Direction,
    pub fair_probability: Decimal,
    pub confidence: Decimal,
    pub key_drivers: Vec<String>,
    pub delay: Duration,
    pub should_fail: bool,
    pub should_panic: bool,
    /// Token usage reported per invocation, priced as Nova Lite.
    pub usage_tokens: Option<(u64, u64)>,
    seen_memory: Mutex<Option<AgentMemoryContext>>,
}

impl MockAgent {
    pub fn new(
        name: &str,
        direction: Direction,
        fair_probability: Decimal,
        confidence: Decimal,
        key_drivers: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            direction,
            fair_probability,
            confidence,
            key_drivers: key_drivers.iter().map(|d| d.to_string()).collect(),
            delay: Duration::ZERO,
            should_fail: false,
            should_panic: false,
            usage_tokens: None,
            seen_memory: Mutex::new(None),
        }
    }

    pub fn failing(name: &str) -> Self {
        let mut mock = Self::new(name, Direction::Neutral, Decimal::ZERO, Decimal::ZERO, &[]);
        mock.should_fail = true;
        mock
    }

    pub fn panicking(name: &str) -> Self {
        let mut mock = Self::new(name, Direction::Neutral, Decimal::ZERO, Decimal::ZERO, &[]);
        mock.should_panic = true;
        mock
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_usage(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.usage_tokens = Some((input_tokens, output_tokens));
        self
    }

    /// The memory context passed to the most recent invocation.
    pub fn seen_memory(&self) -> Option<AgentMemoryContext> {
        lock(&self.seen_memory).clone()
    }

    fn usage(&self) -> Result<Vec<UsageRecord>, AgentError> {
        let Some((input_tokens, output_tokens)) = self.usage_tokens else {
            return Ok(Vec::new());
        };
        let record = record_usage(UsageParams {
            provider: Provider::Nova,
            model_name: "amazon.nova-lite-v1:0".to_string(),
            agent_name: Some(self.name.clone()),
            input_tokens,
            output_tokens,
            metadata: serde_json::Map::new(),
        })?;
        Ok(vec![record])
    }
}

#[async_trait]
impl SignalAgent for MockAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, request: &AgentRequest) -> Result<AgentOutput, AgentError> {
        *lock(&self.seen_memory) = Some(request.memory.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.should_panic {
            panic!("mock agent {} panicked", self.name);
        }
        if self.should_fail {
            return Err(AgentError::Invocation("Mock failure".to_string()));
        }

        let key_drivers = self.key_drivers.clone();
        Ok(AgentOutput {
            signal: AgentSignal::new(
                &self.name,
                self.direction,
                self.fair_probability,
                self.confidence,
                key_drivers,
            ),
            usage: self.usage()?,
        })
    }
}

/// Collects every evolution event it is handed.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<EvolutionEvent>>,
}

impl CollectingSink {
    pub fn events(&self) -> Vec<EvolutionEvent> {
        lock(&self.events).clone()
    }
}

impl EvolutionSink for CollectingSink {
    fn record(&self, event: &EvolutionEvent) {
        lock(&self.events).push(event.clone());
    }
}
