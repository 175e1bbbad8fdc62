use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use mace_budget::{
    apply_cost_optimization, create_cost_optimization_audit_entry, AnalysisCostTracker,
};
use mace_models::agent_message::{AgentOutput, AgentRequest};
use mace_models::analysis::{AgentRunReport, AnalysisReport};
use mace_models::config::{AgentsConfig, CostConfig};
use mace_models::signal::AgentMemoryContext;
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agent::SignalAgent;
use crate::error::AgentError;
use crate::evolution::{log_evolution_events, track_evolution, EvolutionSink, TracingEvolutionSink};
use crate::memory::MemoryRetrievalService;

/// Runs one analysis cycle for a market: admit agents within the cost
/// ceiling, hand each its memory, fan out, then track evolution and spend.
pub struct AnalysisEngine {
    agents: Vec<Arc<dyn SignalAgent>>,
    memory: MemoryRetrievalService,
    cost: CostConfig,
    agent_timeout: Duration,
    evolution_sink: Arc<dyn EvolutionSink>,
}

impl AnalysisEngine {
    pub fn new(
        agents: Vec<Arc<dyn SignalAgent>>,
        memory: MemoryRetrievalService,
        cost: CostConfig,
        agents_config: &AgentsConfig,
    ) -> Self {
        Self {
            agents,
            memory,
            cost,
            agent_timeout: Duration::from_secs(agents_config.agent_timeout_seconds),
            evolution_sink: Arc::new(TracingEvolutionSink),
        }
    }

    pub fn with_evolution_sink(mut self, sink: Arc<dyn EvolutionSink>) -> Self {
        self.evolution_sink = sink;
        self
    }

    pub fn memory(&self) -> &MemoryRetrievalService {
        &self.memory
    }

    /// Analyze `market_id`. Individual agent failures are reported, never
    /// propagated.
    pub async fn analyze(&self, market_id: &str) -> AnalysisReport {
        let start = Instant::now();
        let started_at = Utc::now();
        let analysis_id = Uuid::new_v4();
        info!(market = %market_id, analysis = %analysis_id, "Starting analysis");

        // 1. Admit agents within the cost ceiling
        let candidates: Vec<&str> = self.agents.iter().map(|a| a.name()).collect();
        let allocation = apply_cost_optimization(&candidates, &self.cost);
        let cost_audit = create_cost_optimization_audit_entry(&allocation);

        // 2. Pre-fetch each admitted agent's memory in parallel
        let memories = self
            .memory
            .get_all_agent_memories(market_id, &allocation.selected_agents, self.memory.default_limit())
            .await;

        // 3. Fan out to admitted agents
        let mut handles = Vec::new();
        for name in &allocation.selected_agents {
            let Some(agent) = self.agents.iter().find(|a| a.name() == name) else {
                continue;
            };
            let agent = Arc::clone(agent);
            let memory = memories
                .get(name)
                .cloned()
                .unwrap_or_else(|| AgentMemoryContext::empty(name, market_id));
            let had_history = memory.has_history;
            let request = AgentRequest {
                analysis_id,
                market_id: market_id.to_string(),
                memory,
            };
            let timeout = self.agent_timeout;

            let spawned_at = Instant::now();
            let handle = tokio::spawn(async move {
                let agent_start = Instant::now();
                let result = match tokio::time::timeout(timeout, agent.analyze(&request)).await {
                    Ok(result) => result,
                    Err(_) => Err(AgentError::Timeout(timeout.as_secs())),
                };
                (agent.name().to_string(), request.memory, result, agent_start.elapsed())
            });
            handles.push((name.clone(), had_history, spawned_at, handle));
        }

        // 4. Collect results (graceful degradation)
        let mut tracker = AnalysisCostTracker::new(self.cost.max_cost_per_analysis);
        let mut signals = Vec::new();
        let mut agent_reports = Vec::new();
        let mut evolution_events = Vec::new();

        for (agent_name, had_history, spawned_at, handle) in handles {
            match handle.await {
                Ok((name, memory, Ok(AgentOutput { signal, usage }), elapsed)) => {
                    let signal = signal.clamped();
                    let events = track_evolution(&signal, &memory.signals);
                    log_evolution_events(&events, Some(self.evolution_sink.as_ref()));

                    let cost: Decimal = usage.iter().map(|u| u.total_cost).sum();
                    tracker.extend(usage);

                    info!(
                        agent = %name,
                        direction = %signal.direction,
                        fair_probability = %signal.fair_probability,
                        confidence = %signal.confidence,
                        evolution_events = events.len(),
                        cost = %cost,
                        elapsed_ms = elapsed.as_millis(),
                        "Agent succeeded"
                    );
                    agent_reports.push(AgentRunReport {
                        agent_name: name,
                        succeeded: true,
                        error: None,
                        had_history: memory.has_history,
                        evolution_event_count: events.len(),
                        cost,
                        elapsed_ms: elapsed.as_millis() as u64,
                    });
                    evolution_events.extend(events);
                    signals.push(signal);
                }
                Ok((name, memory, Err(e), elapsed)) => {
                    warn!(agent = %name, error = %e, elapsed_ms = elapsed.as_millis(), "Agent failed");
                    agent_reports.push(AgentRunReport {
                        agent_name: name,
                        succeeded: false,
                        error: Some(e.to_string()),
                        had_history: memory.has_history,
                        evolution_event_count: 0,
                        cost: Decimal::ZERO,
                        elapsed_ms: elapsed.as_millis() as u64,
                    });
                }
                Err(e) => {
                    error!(agent = %agent_name, error = %e, "Agent task panicked");
                    agent_reports.push(AgentRunReport {
                        agent_name,
                        succeeded: false,
                        error: Some(format!("panicked: {e}")),
                        had_history,
                        evolution_event_count: 0,
                        cost: Decimal::ZERO,
                        elapsed_ms: spawned_at.elapsed().as_millis() as u64,
                    });
                }
            }
        }

        // 5. Account for actual spend
        if tracker.is_over_budget() {
            warn!(
                market = %market_id,
                actual_cost = %tracker.total_cost(),
                max_cost = %tracker.max_cost(),
                "Analysis exceeded its cost ceiling"
            );
        }

        let report = AnalysisReport {
            analysis_id,
            market_id: market_id.to_string(),
            started_at,
            signals,
            agent_reports,
            evolution_events,
            cost_audit,
            actual_cost: tracker.total_cost(),
            actual_cost_by_agent: tracker.by_agent(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            market = %market_id,
            analysis = %analysis_id,
            signals = report.signals.len(),
            evolution_events = report.evolution_events.len(),
            actual_cost = %report.actual_cost,
            elapsed_ms = report.elapsed_ms,
            "Analysis complete"
        );

        report
    }
}
