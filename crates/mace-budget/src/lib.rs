//! Cost accounting and cost-constrained agent admission.
//!
//! - [`pricing`]: per-provider token rates and `calculate_cost`
//! - [`usage`]: usage records and their provider / Nova breakdowns
//! - [`tracker`]: actual spend of a single analysis against its ceiling
//! - [`optimizer`]: priority tiers, cost estimates and greedy admission

pub mod error;
pub mod optimizer;
pub mod pricing;
pub mod tracker;
pub mod usage;

pub use error::BudgetError;
pub use optimizer::{
    apply_cost_optimization, create_cost_optimization_audit_entry, estimate_agent_cost,
    filter_agents_by_cost, priority_of,
};
pub use pricing::{calculate_cost, get_nova_pricing, TokenPricing};
pub use tracker::AnalysisCostTracker;
pub use usage::{get_costs_by_provider, get_nova_cost_breakdown, record_usage, UsageParams};
