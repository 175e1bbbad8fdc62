use std::collections::BTreeMap;

use chrono::Utc;
use mace_models::usage::{Provider, UsageRecord, MODEL_VARIANT_KEY};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BudgetError;
use crate::pricing::{calculate_cost, nova_variant_of};

/// Inputs describing one LLM invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageParams {
    pub provider: Provider,
    pub model_name: String,
    #[serde(default)]
    pub agent_name: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Price an invocation and wrap it in an immutable usage record.
///
/// Nova records are tagged with their size variant under `modelVariant`.
pub fn record_usage(params: UsageParams) -> Result<UsageRecord, BudgetError> {
    let total_cost = calculate_cost(
        &params.provider,
        &params.model_name,
        params.input_tokens,
        params.output_tokens,
    )?;

    let mut metadata = params.metadata;
    if params.provider == Provider::Nova {
        let variant = nova_variant_of(&params.model_name)?;
        metadata.insert(
            MODEL_VARIANT_KEY.to_string(),
            serde_json::Value::String(variant.as_str().to_string()),
        );
    }

    Ok(UsageRecord {
        id: Uuid::new_v4(),
        provider: params.provider,
        model: params.model_name,
        agent_name: params.agent_name,
        input_tokens: params.input_tokens,
        output_tokens: params.output_tokens,
        total_cost,
        timestamp: Utc::now(),
        metadata,
    })
}

/// Running totals over a set of usage records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CostSummary {
    pub total_cost: Decimal,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub invocations: u64,
}

impl CostSummary {
    pub fn add(&mut self, record: &UsageRecord) {
        self.total_cost += record.total_cost;
        self.input_tokens += record.input_tokens;
        self.output_tokens += record.output_tokens;
        self.invocations += 1;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderCostSummary {
    #[serde(flatten)]
    pub totals: CostSummary,
    pub models: BTreeMap<String, CostSummary>,
}

/// Per-provider totals, each with a per-model breakdown.
pub fn get_costs_by_provider(records: &[UsageRecord]) -> BTreeMap<String, ProviderCostSummary> {
    let mut by_provider: BTreeMap<String, ProviderCostSummary> = BTreeMap::new();
    for record in records {
        let entry = by_provider
            .entry(record.provider.as_str().to_string())
            .or_default();
        entry.totals.add(record);
        entry
            .models
            .entry(record.model.clone())
            .or_default()
            .add(record);
    }
    by_provider
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NovaCostBreakdown {
    #[serde(flatten)]
    pub totals: CostSummary,
    /// Keyed by `micro` / `lite` / `pro`.
    pub by_variant: BTreeMap<String, CostSummary>,
}

/// Totals for Nova records only, split by size variant.
///
/// Uses the `modelVariant` tag when present and otherwise resolves the model id;
/// records that resolve to neither are grouped under `unknown`.
pub fn get_nova_cost_breakdown(records: &[UsageRecord]) -> NovaCostBreakdown {
    let mut breakdown = NovaCostBreakdown::default();
    for record in records.iter().filter(|r| r.provider == Provider::Nova) {
        let variant = record
            .nova_variant()
            .or_else(|| nova_variant_of(&record.model).ok())
            .map(|v| v.as_str())
            .unwrap_or("unknown");
        breakdown.totals.add(record);
        breakdown
            .by_variant
            .entry(variant.to_string())
            .or_default()
            .add(record);
    }
    breakdown
}
