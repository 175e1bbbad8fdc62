use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::signal::Direction;

/// What changed between an agent's current signal and its previous one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvolutionChange {
    DirectionChange {
        previous: Direction,
        current: Direction,
    },
    ProbabilityShift {
        previous: Decimal,
        current: Decimal,
    },
    ConfidenceChange {
        previous: Decimal,
        current: Decimal,
    },
    ReasoningEvolution {
        previous: Vec<String>,
        current: Vec<String>,
    },
}

impl EvolutionChange {
    pub fn kind(&self) -> &'static str {
        match self {
            EvolutionChange::DirectionChange { .. } => "direction_change",
            EvolutionChange::ProbabilityShift { .. } => "probability_shift",
            EvolutionChange::ConfidenceChange { .. } => "confidence_change",
            EvolutionChange::ReasoningEvolution { .. } => "reasoning_evolution",
        }
    }
}

/// A detected, thresholded change in one agent's output for one market.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvolutionEvent {
    pub agent_name: String,
    pub market_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub change: EvolutionChange,
    /// 0.0 to 1.0.
    pub magnitude: Decimal,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn event_serializes_with_type_tag() {
        let event = EvolutionEvent {
            agent_name: "momentum".to_string(),
            market_id: "mkt-1".to_string(),
            timestamp: Utc::now(),
            change: EvolutionChange::ProbabilityShift {
                previous: dec!(0.60),
                current: dec!(0.75),
            },
            magnitude: dec!(0.15),
            description: "Probability shifted by 15.0%".to_string(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "probability_shift");
        assert_eq!(json["previous"], "0.60");
        assert_eq!(json["current"], "0.75");

        let parsed: EvolutionEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn kind_matches_serde_tag() {
        let change = EvolutionChange::DirectionChange {
            previous: Direction::Yes,
            current: Direction::No,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["type"], change.kind());
    }
}
