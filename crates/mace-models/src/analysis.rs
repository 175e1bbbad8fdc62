use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::budget::CostOptimizationAuditEntry;
use crate::evolution::EvolutionEvent;
use crate::signal::AgentSignal;

/// Outcome of running one agent inside an analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRunReport {
    pub agent_name: String,
    pub succeeded: bool,
    pub error: Option<String>,
    /// Whether the agent was given prior signals for this market.
    pub had_history: bool,
    pub evolution_event_count: usize,
    /// Actual LLM spend reported by the agent.
    pub cost: Decimal,
    pub elapsed_ms: u64,
}

/// Everything one analysis cycle produced, ready for fusion and the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    pub market_id: String,
    pub started_at: DateTime<Utc>,
    pub signals: Vec<AgentSignal>,
    pub agent_reports: Vec<AgentRunReport>,
    pub evolution_events: Vec<EvolutionEvent>,
    pub cost_audit: CostOptimizationAuditEntry,
    pub actual_cost: Decimal,
    pub actual_cost_by_agent: BTreeMap<String, Decimal>,
    pub elapsed_ms: u64,
}

impl AnalysisReport {
    pub fn failed_agents(&self) -> Vec<&str> {
        self.agent_reports
            .iter()
            .filter(|r| !r.succeeded)
            .map(|r| r.agent_name.as_str())
            .collect()
    }
}
