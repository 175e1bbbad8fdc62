pub mod agent;
pub mod error;
pub mod evolution;
pub mod memory;
pub mod normalize;
pub mod orchestrator;
pub mod retry;
pub mod telemetry;

pub mod test_support;

pub use agent::SignalAgent;
pub use error::{AgentError, RetrievalError, RetrievalErrorKind};
pub use evolution::{log_evolution_events, track_evolution, EvolutionSink, TracingEvolutionSink};
pub use memory::{MemoryRetrievalService, MAX_SIGNALS_HARD_CAP};
pub use orchestrator::AnalysisEngine;
pub use retry::RetryPolicy;
pub use telemetry::{RetrievalLog, RetrievalRecord};
