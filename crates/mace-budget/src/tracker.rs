use std::collections::BTreeMap;

use mace_models::usage::UsageRecord;
use rust_decimal::Decimal;

/// Actual spend of one analysis cycle, measured against its ceiling.
///
/// Owned by a single analysis and dropped with it; nothing is shared
/// between concurrent analyses.
#[derive(Debug, Clone)]
pub struct AnalysisCostTracker {
    max_cost: Decimal,
    records: Vec<UsageRecord>,
}

impl AnalysisCostTracker {
    pub fn new(max_cost: Decimal) -> Self {
        Self {
            max_cost,
            records: Vec::new(),
        }
    }

    pub fn record(&mut self, record: UsageRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = UsageRecord>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    pub fn max_cost(&self) -> Decimal {
        self.max_cost
    }

    pub fn total_cost(&self) -> Decimal {
        self.records.iter().map(|r| r.total_cost).sum()
    }

    /// Signed: negative once spend exceeds the ceiling.
    pub fn remaining(&self) -> Decimal {
        self.max_cost - self.total_cost()
    }

    pub fn is_over_budget(&self) -> bool {
        self.total_cost() > self.max_cost
    }

    /// Spend per agent; records without an agent are grouped under `unattributed`.
    pub fn by_agent(&self) -> BTreeMap<String, Decimal> {
        let mut totals = BTreeMap::new();
        for record in &self.records {
            let agent = record.agent_name.as_deref().unwrap_or("unattributed");
            *totals.entry(agent.to_string()).or_insert(Decimal::ZERO) += record.total_cost;
        }
        totals
    }
}
