use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Importance class used to order budget admission.
///
/// Variants are declared in admission order, so `Critical < High < Medium < Low`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityTier {
    Critical,
    High,
    Medium,
    Low,
}

impl PriorityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::Critical => "CRITICAL",
            PriorityTier::High => "HIGH",
            PriorityTier::Medium => "MEDIUM",
            PriorityTier::Low => "LOW",
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of deciding which agents may run under a cost ceiling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetAllocationResult {
    pub selected_agents: Vec<String>,
    pub skipped_agents: Vec<String>,
    /// Sum of the selected agents' estimated costs.
    pub estimated_cost: Decimal,
    pub max_cost: Decimal,
    pub cost_breakdown: BTreeMap<String, Decimal>,
    /// `max_cost - estimated_cost`; negative when CRITICAL agents alone exceed the ceiling.
    pub remaining_budget: Decimal,
    pub optimization_applied: bool,
}

/// Flat projection of a [`BudgetAllocationResult`] for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostOptimizationAuditEntry {
    pub optimization_applied: bool,
    pub max_cost: Decimal,
    pub estimated_cost: Decimal,
    pub remaining_budget: Decimal,
    pub selected_agent_count: usize,
    pub skipped_agent_count: usize,
    pub selected_agents: Vec<String>,
    pub skipped_agents: Vec<String>,
    pub cost_breakdown: BTreeMap<String, Decimal>,
    /// Percentage of `max_cost` consumed.
    pub budget_utilization: Decimal,
}
