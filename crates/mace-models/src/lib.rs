pub mod agent_message;
pub mod analysis;
pub mod budget;
pub mod config;
pub mod evolution;
pub mod signal;
pub mod signal_schema;
pub mod usage;

pub use agent_message::{AgentOutput, AgentRequest};
pub use analysis::{AgentRunReport, AnalysisReport};
pub use budget::{BudgetAllocationResult, CostOptimizationAuditEntry, PriorityTier};
pub use config::{AgentsConfig, CostConfig, MaceConfig, MemoryConfig, StoreConfig};
pub use evolution::{EvolutionChange, EvolutionEvent};
pub use signal::{AgentMemoryContext, AgentSignal, Direction, HistoricalSignal};
pub use signal_schema::{SignalQuery, SignalRow};
pub use usage::{NovaVariant, Provider, UsageRecord};
