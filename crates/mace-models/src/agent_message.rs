use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::signal::{AgentMemoryContext, AgentSignal};
use crate::usage::UsageRecord;

/// Request handed to a signal agent for one market.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRequest {
    pub analysis_id: Uuid,
    pub market_id: String,
    /// The agent's own recent history for this market, pre-fetched by the engine.
    pub memory: AgentMemoryContext,
}

/// What a signal agent produced, plus the LLM usage it incurred doing so.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentOutput {
    pub signal: AgentSignal,
    #[serde(default)]
    pub usage: Vec<UsageRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Direction;
    use rust_decimal_macros::dec;

    #[test]
    fn roundtrip_agent_request() {
        let request = AgentRequest {
            analysis_id: Uuid::new_v4(),
            market_id: "will-it-rain".to_string(),
            memory: AgentMemoryContext::empty("momentum", "will-it-rain"),
        };

        let json = serde_json::to_string(&request).unwrap();
        let deserialized: AgentRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, deserialized);
    }

    #[test]
    fn agent_output_without_usage() {
        let signal = AgentSignal::new(
            "momentum",
            Direction::Yes,
            dec!(0.62),
            dec!(0.7),
            vec!["volume breakout".to_string()],
        );
        let json = serde_json::json!({ "signal": signal });
        let output: AgentOutput = serde_json::from_value(json).unwrap();
        assert!(output.usage.is_empty());
        assert_eq!(output.signal.fair_probability, dec!(0.62));
    }
}
