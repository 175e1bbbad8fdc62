use std::collections::{BTreeMap, HashSet};

use mace_models::budget::{BudgetAllocationResult, CostOptimizationAuditEntry, PriorityTier};
use mace_models::config::CostConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

/// Estimated cost of an agent missing from the profile table.
pub const DEFAULT_AGENT_COST: Decimal = dec!(0.10);

/// Tier and flat per-invocation cost estimate for known agents.
fn agent_profile(agent_id: &str) -> Option<(PriorityTier, Decimal)> {
    let profile = match agent_id {
        // Baseline agents: the analysis is meaningless without them.
        "market_microstructure" => (PriorityTier::Critical, dec!(0.15)),
        "probability_baseline" => (PriorityTier::Critical, dec!(0.12)),
        "risk_assessment" => (PriorityTier::Critical, dec!(0.12)),
        // Event intelligence
        "breaking_news" => (PriorityTier::High, dec!(0.20)),
        "event_impact" => (PriorityTier::High, dec!(0.18)),
        "polling_intelligence" => (PriorityTier::High, dec!(0.15)),
        // Price action
        "momentum" => (PriorityTier::Medium, dec!(0.10)),
        "mean_reversion" => (PriorityTier::Medium, dec!(0.10)),
        // Sentiment / narrative
        "media_sentiment" => (PriorityTier::Low, dec!(0.08)),
        "social_sentiment" => (PriorityTier::Low, dec!(0.08)),
        "narrative_velocity" => (PriorityTier::Low, dec!(0.08)),
        _ => return None,
    };
    Some(profile)
}

/// Priority tier of an agent. Unknown agents are LOW.
pub fn priority_of(agent_id: &str) -> PriorityTier {
    agent_profile(agent_id)
        .map(|(tier, _)| tier)
        .unwrap_or(PriorityTier::Low)
}

/// Estimated cost of a single agent invocation.
pub fn agent_cost(agent_id: &str) -> Decimal {
    agent_profile(agent_id)
        .map(|(_, cost)| cost)
        .unwrap_or(DEFAULT_AGENT_COST)
}

/// Total estimated cost of running every listed agent once.
pub fn estimate_agent_cost<S: AsRef<str>>(agent_ids: &[S]) -> Decimal {
    agent_ids.iter().map(|id| agent_cost(id.as_ref())).sum()
}

/// First occurrence of each id, in candidate order.
fn dedup<S: AsRef<str>>(agent_ids: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    agent_ids
        .iter()
        .map(|id| id.as_ref())
        .filter(|id| seen.insert(*id))
        .map(|id| id.to_string())
        .collect()
}

/// Greedy tiered admission under `max_cost`.
///
/// CRITICAL agents are always selected, even past the ceiling. Whatever budget
/// they leave (floored at zero) is then offered to HIGH, MEDIUM and LOW agents
/// in that order; an agent that does not fit is skipped and evaluation moves on.
/// `skip_low_impact` does not exempt LOW agents from the budget check.
pub fn filter_agents_by_cost<S: AsRef<str>>(
    agent_ids: &[S],
    max_cost: Decimal,
    skip_low_impact: bool,
) -> BudgetAllocationResult {
    let candidates = dedup(agent_ids);

    let mut selected = Vec::new();
    let mut skipped = Vec::new();
    let mut cost_breakdown = BTreeMap::new();

    let critical: Vec<&String> = candidates
        .iter()
        .filter(|id| priority_of(id) == PriorityTier::Critical)
        .collect();
    let critical_cost: Decimal = critical.iter().map(|id| agent_cost(id)).sum();
    for id in critical {
        cost_breakdown.insert(id.clone(), agent_cost(id));
        selected.push(id.clone());
    }

    let mut remaining = (max_cost - critical_cost).max(Decimal::ZERO);

    for tier in [PriorityTier::High, PriorityTier::Medium, PriorityTier::Low] {
        for id in candidates.iter().filter(|id| priority_of(id) == tier) {
            let cost = agent_cost(id);
            if cost <= remaining {
                remaining -= cost;
                cost_breakdown.insert(id.clone(), cost);
                selected.push(id.clone());
            } else {
                debug!(agent = %id, tier = %tier, cost = %cost, remaining = %remaining, "Agent skipped by budget");
                skipped.push(id.clone());
            }
        }
    }

    let estimated_cost: Decimal = cost_breakdown.values().copied().sum();

    debug!(
        selected = selected.len(),
        skipped = skipped.len(),
        estimated_cost = %estimated_cost,
        max_cost = %max_cost,
        skip_low_impact,
        "Cost filter applied"
    );

    BudgetAllocationResult {
        optimization_applied: !skipped.is_empty(),
        selected_agents: selected,
        skipped_agents: skipped,
        estimated_cost,
        max_cost,
        cost_breakdown,
        remaining_budget: max_cost - estimated_cost,
    }
}

/// Engine-level gate: bypass entirely when cost optimization is disabled.
pub fn apply_cost_optimization<S: AsRef<str>>(
    agent_ids: &[S],
    config: &CostConfig,
) -> BudgetAllocationResult {
    let max_cost = config.max_cost_per_analysis;

    if !config.skip_low_impact_agents {
        let selected = dedup(agent_ids);
        let cost_breakdown: BTreeMap<String, Decimal> = selected
            .iter()
            .map(|id| (id.clone(), agent_cost(id)))
            .collect();
        let estimated_cost: Decimal = cost_breakdown.values().copied().sum();
        return BudgetAllocationResult {
            selected_agents: selected,
            skipped_agents: Vec::new(),
            estimated_cost,
            max_cost,
            cost_breakdown,
            remaining_budget: max_cost - estimated_cost,
            optimization_applied: false,
        };
    }

    let result = filter_agents_by_cost(agent_ids, max_cost, true);
    if result.optimization_applied {
        info!(
            skipped = ?result.skipped_agents,
            estimated_cost = %result.estimated_cost,
            max_cost = %max_cost,
            "Cost optimization skipped agents"
        );
    }
    result
}

/// Flat, loggable projection of an allocation for the audit trail.
pub fn create_cost_optimization_audit_entry(
    result: &BudgetAllocationResult,
) -> CostOptimizationAuditEntry {
    let budget_utilization = if result.max_cost > Decimal::ZERO {
        (result.estimated_cost / result.max_cost * dec!(100)).round_dp(2)
    } else if result.estimated_cost > Decimal::ZERO {
        dec!(100)
    } else {
        Decimal::ZERO
    };

    CostOptimizationAuditEntry {
        optimization_applied: result.optimization_applied,
        max_cost: result.max_cost,
        estimated_cost: result.estimated_cost,
        remaining_budget: result.remaining_budget,
        selected_agent_count: result.selected_agents.len(),
        skipped_agent_count: result.skipped_agents.len(),
        selected_agents: result.selected_agents.clone(),
        skipped_agents: result.skipped_agents.clone(),
        cost_breakdown: result.cost_breakdown.clone(),
        budget_utilization,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_AGENTS: [&str; 11] = [
        "market_microstructure",
        "probability_baseline",
        "risk_assessment",
        "breaking_news",
        "event_impact",
        "polling_intelligence",
        "momentum",
        "mean_reversion",
        "media_sentiment",
        "social_sentiment",
        "narrative_velocity",
    ];

    fn config(max_cost: Decimal, enabled: bool) -> CostConfig {
        CostConfig {
            max_cost_per_analysis: max_cost,
            skip_low_impact_agents: enabled,
        }
    }

    #[test]
    fn priority_table() {
        assert_eq!(priority_of("market_microstructure"), PriorityTier::Critical);
        assert_eq!(priority_of("risk_assessment"), PriorityTier::Critical);
        assert_eq!(priority_of("polling_intelligence"), PriorityTier::High);
        assert_eq!(priority_of("mean_reversion"), PriorityTier::Medium);
        assert_eq!(priority_of("social_sentiment"), PriorityTier::Low);
        assert_eq!(priority_of("crystal_ball"), PriorityTier::Low);
    }

    #[test]
    fn estimate_empty_is_zero() {
        let none: [&str; 0] = [];
        assert_eq!(estimate_agent_cost(&none), Decimal::ZERO);
    }

    #[test]
    fn estimate_unknown_agent_uses_default() {
        assert_eq!(estimate_agent_cost(&["crystal_ball"]), dec!(0.10));
    }

    #[test]
    fn estimate_is_additive() {
        let (left, right) = ALL_AGENTS.split_at(4);
        assert_eq!(
            estimate_agent_cost(&ALL_AGENTS),
            estimate_agent_cost(left) + estimate_agent_cost(right)
        );
        assert_eq!(estimate_agent_cost(&ALL_AGENTS), dec!(1.36));
    }

    #[test]
    fn critical_agent_selected_under_tiny_budget() {
        let result = filter_agents_by_cost(&["market_microstructure"], dec!(0.01), true);
        assert_eq!(result.selected_agents, vec!["market_microstructure"]);
        assert!(result.skipped_agents.is_empty());
        assert!(result.estimated_cost > dec!(0.01));
    }

    #[test]
    fn critical_overrun_leaves_negative_remainder() {
        let result = filter_agents_by_cost(
            &["market_microstructure", "probability_baseline", "momentum"],
            dec!(0.10),
            true,
        );
        assert_eq!(
            result.selected_agents,
            vec!["market_microstructure", "probability_baseline"]
        );
        assert_eq!(result.skipped_agents, vec!["momentum"]);
        assert_eq!(result.estimated_cost, dec!(0.27));
        assert_eq!(result.remaining_budget, dec!(-0.17));
        assert!(result.optimization_applied);
    }

    #[test]
    fn greedy_in_tier_order_without_backtracking() {
        // 0.39 critical, 0.21 left: event_impact (0.18) is evaluated first and
        // fits, after which nothing else fits in the remaining 0.03.
        let result = filter_agents_by_cost(
            &[
                "media_sentiment",
                "momentum",
                "event_impact",
                "breaking_news",
                "market_microstructure",
                "probability_baseline",
                "risk_assessment",
            ],
            dec!(0.60),
            true,
        );
        assert_eq!(
            result.selected_agents,
            vec![
                "market_microstructure",
                "probability_baseline",
                "risk_assessment",
                "event_impact",
            ]
        );
        assert_eq!(
            result.skipped_agents,
            vec!["breaking_news", "momentum", "media_sentiment"]
        );
        assert_eq!(result.estimated_cost, dec!(0.57));
        assert_eq!(result.remaining_budget, dec!(0.03));
    }

    #[test]
    fn skipped_agent_does_not_stop_cheaper_ones() {
        // 0.15 left after market_microstructure: breaking_news (0.20) is skipped,
        // momentum (0.10) still fits.
        let result = filter_agents_by_cost(
            &["market_microstructure", "breaking_news", "momentum"],
            dec!(0.30),
            true,
        );
        assert_eq!(
            result.selected_agents,
            vec!["market_microstructure", "momentum"]
        );
        assert_eq!(result.skipped_agents, vec!["breaking_news"]);
    }

    #[test]
    fn low_tier_still_budgeted_without_skip_flag() {
        let result = filter_agents_by_cost(&["media_sentiment"], dec!(0.05), false);
        assert_eq!(result.skipped_agents, vec!["media_sentiment"]);
        assert!(result.selected_agents.is_empty());
    }

    #[test]
    fn estimated_plus_remaining_equals_max_cost() {
        for max_cost in [dec!(0), dec!(0.01), dec!(0.33), dec!(0.75), dec!(5)] {
            let result = filter_agents_by_cost(&ALL_AGENTS, max_cost, true);
            assert_eq!(result.estimated_cost + result.remaining_budget, max_cost);
            for critical in ["market_microstructure", "probability_baseline", "risk_assessment"] {
                assert!(result.selected_agents.iter().any(|a| a == critical));
            }
        }
    }

    #[test]
    fn generous_budget_selects_everything() {
        let result = filter_agents_by_cost(&ALL_AGENTS, dec!(5), true);
        assert_eq!(result.selected_agents.len(), ALL_AGENTS.len());
        assert!(!result.optimization_applied);
        assert_eq!(result.cost_breakdown.len(), ALL_AGENTS.len());
    }

    #[test]
    fn duplicates_are_counted_once() {
        let result = filter_agents_by_cost(&["momentum", "momentum"], dec!(1), true);
        assert_eq!(result.selected_agents, vec!["momentum"]);
        assert_eq!(result.estimated_cost, dec!(0.10));
    }

    #[test]
    fn disabled_optimization_selects_all() {
        let result = apply_cost_optimization(&ALL_AGENTS, &config(dec!(0.01), false));
        assert_eq!(result.selected_agents.len(), ALL_AGENTS.len());
        assert!(result.skipped_agents.is_empty());
        assert!(!result.optimization_applied);
        assert_eq!(result.estimated_cost, dec!(1.36));
        assert_eq!(result.remaining_budget, dec!(-1.35));
    }

    #[test]
    fn enabled_optimization_reports_pruning() {
        let pruned = apply_cost_optimization(&ALL_AGENTS, &config(dec!(0.50), true));
        assert!(pruned.optimization_applied);
        assert!(!pruned.skipped_agents.is_empty());

        let untouched = apply_cost_optimization(&ALL_AGENTS, &config(dec!(2), true));
        assert!(!untouched.optimization_applied);
    }

    #[test]
    fn audit_entry_projection() {
        let result = filter_agents_by_cost(
            &["market_microstructure", "momentum", "media_sentiment"],
            dec!(0.30),
            true,
        );
        let entry = create_cost_optimization_audit_entry(&result);

        assert_eq!(entry.selected_agent_count, 2);
        assert_eq!(entry.skipped_agent_count, 1);
        assert_eq!(entry.skipped_agents, vec!["media_sentiment"]);
        assert_eq!(entry.estimated_cost, dec!(0.25));
        assert_eq!(entry.remaining_budget, dec!(0.05));
        assert_eq!(entry.budget_utilization, dec!(83.33));
        assert!(entry.optimization_applied);
    }

    #[test]
    fn audit_entry_zero_ceiling() {
        let none: [&str; 0] = [];
        let empty = filter_agents_by_cost(&none, Decimal::ZERO, true);
        assert_eq!(
            create_cost_optimization_audit_entry(&empty).budget_utilization,
            Decimal::ZERO
        );

        let critical = filter_agents_by_cost(&["risk_assessment"], Decimal::ZERO, true);
        assert_eq!(
            create_cost_optimization_audit_entry(&critical).budget_utilization,
            dec!(100)
        );
    }
}
