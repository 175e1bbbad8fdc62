use async_trait::async_trait;
use mace_models::agent_message::{AgentOutput, AgentRequest};

use crate::error::AgentError;

/// A market analyst that turns a request (market + its own memory) into a
/// signal. Mockable for testing.
///
/// Implementations own their LLM client; any usage they incur is reported in
/// [`AgentOutput::usage`] so the engine can account for it.
#[async_trait]
pub trait SignalAgent: Send + Sync {
    /// Identifier used for cost profiles, memory lookups and reports.
    fn name(&self) -> &str;

    async fn analyze(&self, request: &AgentRequest) -> Result<AgentOutput, AgentError>;
}
