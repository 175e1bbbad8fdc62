use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// LLM provider behind an invocation.
///
/// Serialized as a lowercase string; unrecognized names are kept verbatim in
/// `Other` so usage records round-trip without loss.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(from = "String", into = "String")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
    Nova,
    Other(String),
}

impl Provider {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Provider::OpenAi,
            "anthropic" => Provider::Anthropic,
            "google" | "gemini" => Provider::Google,
            "nova" | "bedrock-nova" | "amazon" => Provider::Nova,
            _ => Provider::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::Nova => "nova",
            Provider::Other(name) => name,
        }
    }
}

impl From<String> for Provider {
    fn from(raw: String) -> Self {
        Provider::parse(&raw)
    }
}

impl From<Provider> for String {
    fn from(provider: Provider) -> Self {
        provider.as_str().to_string()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size variant of an Amazon Nova model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum NovaVariant {
    Micro,
    Lite,
    Pro,
}

impl NovaVariant {
    pub const ALL: [NovaVariant; 3] = [NovaVariant::Micro, NovaVariant::Lite, NovaVariant::Pro];

    pub fn as_str(&self) -> &'static str {
        match self {
            NovaVariant::Micro => "micro",
            NovaVariant::Lite => "lite",
            NovaVariant::Pro => "pro",
        }
    }

    /// Bedrock model id, e.g. `amazon.nova-lite-v1:0`.
    pub fn model_id(&self) -> String {
        format!("amazon.nova-{}-v1:0", self.as_str())
    }
}

impl fmt::Display for NovaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata key carrying the Nova size variant on usage records.
pub const MODEL_VARIANT_KEY: &str = "modelVariant";

/// Cost and token accounting for a single LLM invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageRecord {
    pub id: Uuid,
    pub provider: Provider,
    pub model: String,
    pub agent_name: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_cost: Decimal,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl UsageRecord {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// The Nova variant tag, if this record carries one.
    pub fn nova_variant(&self) -> Option<NovaVariant> {
        self.metadata
            .get(MODEL_VARIANT_KEY)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn provider_parsing() {
        assert_eq!(Provider::parse("OpenAI"), Provider::OpenAi);
        assert_eq!(Provider::parse("bedrock-nova"), Provider::Nova);
        assert_eq!(Provider::parse("gemini"), Provider::Google);
        assert_eq!(
            Provider::parse("mistral"),
            Provider::Other("mistral".to_string())
        );
    }

    #[test]
    fn provider_serializes_as_string() {
        assert_eq!(serde_json::to_string(&Provider::Nova).unwrap(), "\"nova\"");
        let parsed: Provider = serde_json::from_str("\"anthropic\"").unwrap();
        assert_eq!(parsed, Provider::Anthropic);
    }

    #[test]
    fn nova_model_ids() {
        assert_eq!(NovaVariant::Lite.model_id(), "amazon.nova-lite-v1:0");
        assert_eq!(NovaVariant::ALL.len(), 3);
    }

    #[test]
    fn usage_record_reads_variant_tag() {
        let mut metadata = serde_json::Map::new();
        metadata.insert(MODEL_VARIANT_KEY.to_string(), serde_json::json!("pro"));
        let record = UsageRecord {
            id: Uuid::new_v4(),
            provider: Provider::Nova,
            model: "amazon.nova-pro-v1:0".to_string(),
            agent_name: Some("breaking_news".to_string()),
            input_tokens: 1000,
            output_tokens: 200,
            total_cost: dec!(0.00144),
            timestamp: Utc::now(),
            metadata,
        };
        assert_eq!(record.nova_variant(), Some(NovaVariant::Pro));
        assert_eq!(record.total_tokens(), 1200);
    }
}
