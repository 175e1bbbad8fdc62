use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Top-level configuration for MACE.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MaceConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub cost: CostConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
}

/// Where historical agent signals are read from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Path to the SQLite database holding the `agent_signals` table.
    pub sqlite_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/mace_signals.db".to_string(),
        }
    }
}

/// Memory retrieval knobs: retry policy, query timeout and history depth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryConfig {
    /// Total attempts per retrieval, including the first.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Each storage query races against this timer.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    /// Default history depth per agent. Never more than 5 are returned.
    #[serde(default = "default_max_signals_per_agent")]
    pub max_signals_per_agent: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            query_timeout_ms: default_query_timeout_ms(),
            max_signals_per_agent: default_max_signals_per_agent(),
        }
    }
}

/// Per-analysis cost ceiling and whether it is enforced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostConfig {
    #[serde(default = "default_max_cost_per_analysis")]
    pub max_cost_per_analysis: Decimal,
    /// When false, every candidate agent runs regardless of cost.
    #[serde(default = "default_true")]
    pub skip_low_impact_agents: bool,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            max_cost_per_analysis: default_max_cost_per_analysis(),
            skip_low_impact_agents: true,
        }
    }
}

/// Which agents participate in an analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentsConfig {
    /// Per-agent invocation timeout in seconds.
    #[serde(default = "default_agent_timeout")]
    pub agent_timeout_seconds: u64,
    /// Candidate agent identifiers, before cost optimization.
    #[serde(default = "default_enabled_agents")]
    pub enabled: Vec<String>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            agent_timeout_seconds: default_agent_timeout(),
            enabled: default_enabled_agents(),
        }
    }
}

fn default_retry_attempts() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    100
}
fn default_max_delay_ms() -> u64 {
    2_000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_query_timeout_ms() -> u64 {
    5_000
}
fn default_max_signals_per_agent() -> usize {
    3
}
fn default_max_cost_per_analysis() -> Decimal {
    dec!(1.00)
}
fn default_true() -> bool {
    true
}
fn default_agent_timeout() -> u64 {
    60
}
fn default_enabled_agents() -> Vec<String> {
    [
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
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
