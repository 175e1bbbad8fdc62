use mace_models::usage::{NovaVariant, Provider};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BudgetError;

/// Published USD rates per 1,000 tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPricing {
    pub input_per_1k: Decimal,
    pub output_per_1k: Decimal,
}

impl TokenPricing {
    pub const fn new(input_per_1k: Decimal, output_per_1k: Decimal) -> Self {
        Self {
            input_per_1k,
            output_per_1k,
        }
    }

    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> Decimal {
        let thousand = dec!(1000);
        Decimal::from(input_tokens) * self.input_per_1k / thousand
            + Decimal::from(output_tokens) * self.output_per_1k / thousand
    }
}

/// GPT-4 class. Also the fallback for providers without a table entry.
pub const OPENAI_PRICING: TokenPricing = TokenPricing::new(dec!(0.03), dec!(0.06));
/// Claude Sonnet class.
pub const ANTHROPIC_PRICING: TokenPricing = TokenPricing::new(dec!(0.003), dec!(0.015));
/// Gemini Pro class.
pub const GOOGLE_PRICING: TokenPricing = TokenPricing::new(dec!(0.00125), dec!(0.005));

pub const NOVA_MICRO_PRICING: TokenPricing = TokenPricing::new(dec!(0.000035), dec!(0.00014));
pub const NOVA_LITE_PRICING: TokenPricing = TokenPricing::new(dec!(0.00006), dec!(0.00024));
pub const NOVA_PRO_PRICING: TokenPricing = TokenPricing::new(dec!(0.0008), dec!(0.0032));

pub fn nova_variant_pricing(variant: NovaVariant) -> TokenPricing {
    match variant {
        NovaVariant::Micro => NOVA_MICRO_PRICING,
        NovaVariant::Lite => NOVA_LITE_PRICING,
        NovaVariant::Pro => NOVA_PRO_PRICING,
    }
}

/// Resolve a Nova model identifier to its size variant.
///
/// Accepts Bedrock ids (`amazon.nova-lite-v1:0`, including region-prefixed
/// inference profiles), `nova-lite`, or the bare variant name.
pub fn nova_variant_of(model: &str) -> Result<NovaVariant, BudgetError> {
    let id = model.trim().to_ascii_lowercase();
    NovaVariant::ALL
        .into_iter()
        .find(|variant| {
            let name = variant.as_str();
            let family = format!("nova-{name}");
            id == name || id.ends_with(&family) || id.contains(&format!("{family}-"))
        })
        .ok_or_else(|| BudgetError::UnknownNovaModel {
            model: model.to_string(),
            valid: NovaVariant::ALL
                .iter()
                .map(|v| v.model_id())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// Pricing for a Nova model. Unknown identifiers are a configuration error.
pub fn get_nova_pricing(model: &str) -> Result<TokenPricing, BudgetError> {
    nova_variant_of(model).map(nova_variant_pricing)
}

/// Per-provider pricing for everything except Nova, which is priced per model.
pub fn provider_pricing(provider: &Provider) -> TokenPricing {
    match provider {
        Provider::OpenAi => OPENAI_PRICING,
        Provider::Anthropic => ANTHROPIC_PRICING,
        Provider::Google => GOOGLE_PRICING,
        Provider::Nova | Provider::Other(_) => OPENAI_PRICING,
    }
}

/// USD cost of one invocation.
pub fn calculate_cost(
    provider: &Provider,
    model: &str,
    input_tokens: u64,
    output_tokens: u64,
) -> Result<Decimal, BudgetError> {
    let pricing = match provider {
        Provider::Nova => get_nova_pricing(model)?,
        Provider::Other(name) => {
            debug!(provider = %name, "No pricing table for provider, using OpenAI rates");
            OPENAI_PRICING
        }
        known => provider_pricing(known),
    };
    Ok(pricing.cost(input_tokens, output_tokens))
}
