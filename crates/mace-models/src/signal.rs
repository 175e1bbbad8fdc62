use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An agent's stance on a binary market.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Yes,
    No,
    Neutral,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Yes => "YES",
            Direction::No => "NO",
            Direction::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored direction is outside the accepted vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDirection(pub String);

impl fmt::Display for UnknownDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown direction: {:?}", self.0)
    }
}

impl std::error::Error for UnknownDirection {}

impl FromStr for Direction {
    type Err = UnknownDirection;

    /// Accepts the current vocabulary plus the legacy `LONG_YES` / `LONG_NO` /
    /// `NO_TRADE` spellings still present in older rows.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "YES" | "LONG_YES" => Ok(Direction::Yes),
            "NO" | "LONG_NO" => Ok(Direction::No),
            "NEUTRAL" | "NO_TRADE" => Ok(Direction::Neutral),
            _ => Err(UnknownDirection(raw.to_string())),
        }
    }
}

/// Clamp a probability-like value into [0, 1].
pub fn clamp_unit(value: Decimal) -> Decimal {
    value.clamp(Decimal::ZERO, Decimal::ONE)
}

/// A freshly produced agent opinion about a market.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSignal {
    pub agent_name: String,
    pub direction: Direction,
    /// Estimated true probability of the YES outcome, 0.0 to 1.0.
    pub fair_probability: Decimal,
    /// 0.0 to 1.0.
    pub confidence: Decimal,
    /// Ordered, most important first.
    pub key_drivers: Vec<String>,
    #[serde(default)]
    pub risk_factors: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl AgentSignal {
    pub fn new(
        agent_name: impl Into<String>,
        direction: Direction,
        fair_probability: Decimal,
        confidence: Decimal,
        key_drivers: Vec<String>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            direction,
            fair_probability: clamp_unit(fair_probability),
            confidence: clamp_unit(confidence),
            key_drivers,
            risk_factors: None,
            metadata: serde_json::Map::new(),
            created_at: Utc::now(),
        }
    }

    /// Re-apply the [0, 1] bounds, e.g. after deserializing agent output.
    pub fn clamped(mut self) -> Self {
        self.fair_probability = clamp_unit(self.fair_probability);
        self.confidence = clamp_unit(self.confidence);
        self
    }
}

/// A previously persisted signal, normalized on the way out of storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricalSignal {
    pub agent_name: String,
    pub market_id: String,
    pub direction: Direction,
    pub fair_probability: Option<Decimal>,
    pub confidence: Option<Decimal>,
    pub key_drivers: Vec<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub retrieved_at: DateTime<Utc>,
}

/// An agent's own recent history for one market, most recent first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentMemoryContext {
    pub agent_name: String,
    pub market_id: String,
    pub signals: Vec<HistoricalSignal>,
    pub has_history: bool,
}

impl AgentMemoryContext {
    pub fn new(agent_name: &str, market_id: &str, signals: Vec<HistoricalSignal>) -> Self {
        Self {
            agent_name: agent_name.to_string(),
            market_id: market_id.to_string(),
            has_history: !signals.is_empty(),
            signals,
        }
    }

    /// The context every failed retrieval degrades to.
    pub fn empty(agent_name: &str, market_id: &str) -> Self {
        Self::new(agent_name, market_id, Vec::new())
    }

    pub fn latest(&self) -> Option<&HistoricalSignal> {
        self.signals.first()
    }
}
