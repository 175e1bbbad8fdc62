//! Validation and normalization of raw signal rows read back from storage.
//!
//! Rows written by older pipeline versions are not trusted: anything that
//! fails validation is dropped, while malformed JSON payloads degrade to
//! empty collections.

use chrono::{DateTime, NaiveDateTime, Utc};
use mace_models::signal::{Direction, HistoricalSignal};
use mace_models::signal_schema::SignalRow;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::debug;

/// Turn a raw row into a [`HistoricalSignal`], or explain why it was rejected.
pub fn normalize_row(row: SignalRow, retrieved_at: DateTime<Utc>) -> Result<HistoricalSignal, String> {
    if row.agent_name.trim().is_empty() {
        return Err("missing agent_name".to_string());
    }
    if row.market_id.trim().is_empty() {
        return Err("missing market_id".to_string());
    }

    let created_at = match row.created_at.as_deref() {
        Some(raw) => parse_timestamp(raw).ok_or_else(|| format!("bad created_at: {raw:?}"))?,
        None => return Err("missing created_at".to_string()),
    };

    let direction = match row.direction.as_deref() {
        Some(raw) => raw.parse::<Direction>().map_err(|e| e.to_string())?,
        None => return Err("missing direction".to_string()),
    };

    let fair_probability = unit_value("fair_probability", row.fair_probability)?;
    let confidence = unit_value("confidence", row.confidence)?;

    Ok(HistoricalSignal {
        agent_name: row.agent_name,
        market_id: row.market_id,
        direction,
        fair_probability,
        confidence,
        key_drivers: parse_string_list(row.key_drivers),
        metadata: parse_object(row.metadata),
        created_at,
        retrieved_at,
    })
}

/// RFC 3339, or SQLite's `CURRENT_TIMESTAMP` form interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn unit_value(field: &str, value: Option<f64>) -> Result<Option<Decimal>, String> {
    let Some(value) = value else {
        return Ok(None);
    };
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{field} out of range: {value}"));
    }
    Decimal::from_f64(value)
        .map(Some)
        .ok_or_else(|| format!("{field} not representable: {value}"))
}

/// Key drivers arrive as a JSON-encoded string or a native array.
/// Non-string elements are dropped.
pub fn parse_string_list(value: Option<Value>) -> Vec<String> {
    let items = match decode(value) {
        Some(Value::Array(items)) => items,
        Some(other) => {
            debug!(value = %other, "key_drivers is not an array, ignoring");
            return Vec::new();
        }
        None => return Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

/// Metadata arrives as a JSON-encoded string or a native object.
pub fn parse_object(value: Option<Value>) -> Map<String, Value> {
    match decode(value) {
        Some(Value::Object(map)) => map,
        Some(other) => {
            debug!(value = %other, "metadata is not an object, ignoring");
            Map::new()
        }
        None => Map::new(),
    }
}

fn decode(value: Option<Value>) -> Option<Value> {
    match value? {
        Value::Null => None,
        Value::String(text) => {
            if text.trim().is_empty() {
                return None;
            }
            match serde_json::from_str(&text) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    debug!(error = %e, "Malformed JSON column, treating as empty");
                    None
                }
            }
        }
        native => Some(native),
    }
}
