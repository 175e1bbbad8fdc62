/// The table the analysis pipeline persists agent signals into and the
/// memory subsystem reads back from.
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS agent_signals (
///     id                INTEGER PRIMARY KEY AUTOINCREMENT,
///     agent_name        TEXT NOT NULL,
///     market_id         TEXT NOT NULL,
///     direction         TEXT,
///     fair_probability  REAL,
///     confidence        REAL,
///     key_drivers       TEXT,
///     metadata          TEXT,
///     created_at        TEXT
/// );
///
/// CREATE INDEX IF NOT EXISTS idx_signals_agent_market
///     ON agent_signals(agent_name, market_id, created_at DESC);
/// ```
///
/// Only `agent_name` and `market_id` are enforced by the schema; every other
/// column is validated row-by-row on read.
pub const SIGNAL_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS agent_signals (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    agent_name        TEXT NOT NULL,
    market_id         TEXT NOT NULL,
    direction         TEXT,
    fair_probability  REAL,
    confidence        REAL,
    key_drivers       TEXT,
    metadata          TEXT,
    created_at        TEXT
);
CREATE INDEX IF NOT EXISTS idx_signals_agent_market
    ON agent_signals(agent_name, market_id, created_at DESC);
";

/// A raw signal row as returned by storage, before validation.
///
/// `key_drivers` and `metadata` may hold either a JSON-encoded string (SQL
/// text columns) or a native array/object (document stores).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalRow {
    pub agent_name: String,
    pub market_id: String,
    pub direction: Option<String>,
    pub fair_probability: Option<f64>,
    pub confidence: Option<f64>,
    pub key_drivers: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<String>,
}

/// Parameters of a "most recent signals" lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalQuery {
    pub agent_name: String,
    pub market_id: String,
    pub limit: usize,
}

impl SignalQuery {
    pub fn new(agent_name: &str, market_id: &str, limit: usize) -> Self {
        Self {
            agent_name: agent_name.to_string(),
            market_id: market_id.to_string(),
            limit,
        }
    }
}
