//! MACE - Multi-Agent Consensus Engine, memory and cost layer
//!
//! Gives each market-analysis agent its own recent history for a market,
//! detects how its opinion evolved, and keeps every analysis inside a cost
//! ceiling.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use mace::agents::{AnalysisEngine, MemoryRetrievalService, SignalAgent};
//! use mace::budget::{apply_cost_optimization, record_usage, UsageParams};
//! use mace::models::config::MaceConfig;
//! use mace::store::SqliteSignalStore;
//! ```

pub use mace_agents as agents;
pub use mace_budget as budget;
pub use mace_models as models;
pub use mace_store as store;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use mace_agents::{AnalysisEngine, MemoryRetrievalService, RetrievalLog, SignalAgent};
use mace_models::config::MaceConfig;
use mace_store::SqliteSignalStore;
use tracing::{debug, info};

/// Load configuration from a TOML file. A missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<MaceConfig, anyhow::Error> {
    let path = path.as_ref();
    if !path.exists() {
        info!(path = %path.display(), "Config file not found, using defaults");
        return Ok(MaceConfig::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Build a memory service over the configured SQLite signal database.
pub fn build_memory_service(config: &MaceConfig) -> Result<MemoryRetrievalService, anyhow::Error> {
    let store = SqliteSignalStore::open(&config.store.sqlite_path)
        .with_context(|| format!("Failed to open signal store: {}", config.store.sqlite_path))?;
    Ok(MemoryRetrievalService::from_config(
        Arc::new(store),
        &config.memory,
        Arc::new(RetrievalLog::default()),
    ))
}

/// Build an analysis engine from configuration and the caller's agents.
///
/// Agents not listed in `agents.enabled` are left out.
pub fn build_engine(
    config: &MaceConfig,
    agents: Vec<Arc<dyn SignalAgent>>,
) -> Result<AnalysisEngine, anyhow::Error> {
    let memory = build_memory_service(config)?;
    let enabled: Vec<Arc<dyn SignalAgent>> = agents
        .into_iter()
        .filter(|agent| {
            let keep = config.agents.enabled.iter().any(|name| name == agent.name());
            if !keep {
                debug!(agent = %agent.name(), "Agent not enabled, leaving it out");
            }
            keep
        })
        .collect();

    Ok(AnalysisEngine::new(
        enabled,
        memory,
        config.cost.clone(),
        &config.agents,
    ))
}
