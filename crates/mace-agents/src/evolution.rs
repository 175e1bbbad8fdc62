use std::collections::BTreeSet;

use mace_models::evolution::{EvolutionChange, EvolutionEvent};
use mace_models::signal::{clamp_unit, AgentSignal, HistoricalSignal};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

/// Absolute probability change that counts as a shift. Strictly greater than.
pub const PROBABILITY_SHIFT_THRESHOLD: Decimal = dec!(0.10);
/// Absolute confidence change that counts as a change. Strictly greater than.
pub const CONFIDENCE_CHANGE_THRESHOLD: Decimal = dec!(0.20);
/// Key-driver overlap at or below which reasoning is considered to have evolved.
pub const REASONING_OVERLAP_THRESHOLD: Decimal = dec!(0.5);

/// Compare a new signal against the agent's most recent historical one.
///
/// `history` is newest first; only its first entry is consulted. Returns an
/// empty list when there is no history.
pub fn track_evolution(current: &AgentSignal, history: &[HistoricalSignal]) -> Vec<EvolutionEvent> {
    let Some(previous) = history.first() else {
        return Vec::new();
    };

    let event = |change: EvolutionChange, magnitude: Decimal, description: String| EvolutionEvent {
        agent_name: current.agent_name.clone(),
        market_id: previous.market_id.clone(),
        timestamp: current.created_at,
        change,
        magnitude: clamp_unit(magnitude),
        description,
    };

    let mut events = Vec::new();

    if current.direction != previous.direction {
        events.push(event(
            EvolutionChange::DirectionChange {
                previous: previous.direction,
                current: current.direction,
            },
            Decimal::ONE,
            format!(
                "Direction changed from {} to {}",
                previous.direction, current.direction
            ),
        ));
    }

    if let Some(prior) = previous.fair_probability {
        let delta = current.fair_probability - prior;
        if delta.abs() > PROBABILITY_SHIFT_THRESHOLD {
            events.push(event(
                EvolutionChange::ProbabilityShift {
                    previous: prior,
                    current: current.fair_probability,
                },
                delta.abs(),
                format!(
                    "Probability {} by {:.1}% ({:.1}% -> {:.1}%)",
                    rise_or_fall(delta),
                    delta.abs() * dec!(100),
                    prior * dec!(100),
                    current.fair_probability * dec!(100)
                ),
            ));
        }
    }

    if let Some(prior) = previous.confidence {
        let delta = current.confidence - prior;
        if delta.abs() > CONFIDENCE_CHANGE_THRESHOLD {
            events.push(event(
                EvolutionChange::ConfidenceChange {
                    previous: prior,
                    current: current.confidence,
                },
                delta.abs(),
                format!(
                    "Confidence {} by {:.1}% ({:.1}% -> {:.1}%)",
                    rise_or_fall(delta),
                    delta.abs() * dec!(100),
                    prior * dec!(100),
                    current.confidence * dec!(100)
                ),
            ));
        }
    }

    let before = normalized_drivers(&previous.key_drivers);
    let after = normalized_drivers(&current.key_drivers);
    if before != after {
        let shared = before.intersection(&after).count();
        let larger = before.len().max(after.len());
        let overlap = Decimal::from(shared) / Decimal::from(larger);
        if overlap <= REASONING_OVERLAP_THRESHOLD {
            events.push(event(
                EvolutionChange::ReasoningEvolution {
                    previous: previous.key_drivers.clone(),
                    current: current.key_drivers.clone(),
                },
                Decimal::ONE - overlap,
                format!(
                    "Reasoning changed significantly: {shared} of {larger} key drivers retained"
                ),
            ));
        }
    }

    events
}

fn rise_or_fall(delta: Decimal) -> &'static str {
    if delta.is_sign_negative() {
        "decreased"
    } else {
        "increased"
    }
}

/// Drivers compared case- and whitespace-insensitively; blanks ignored.
fn normalized_drivers(drivers: &[String]) -> BTreeSet<String> {
    drivers
        .iter()
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

/// Destination for detected evolution events.
pub trait EvolutionSink: Send + Sync {
    fn record(&self, event: &EvolutionEvent);
}

/// Emits each event as a structured `info!` log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvolutionSink;

impl EvolutionSink for TracingEvolutionSink {
    fn record(&self, event: &EvolutionEvent) {
        info!(
            agent = %event.agent_name,
            market = %event.market_id,
            kind = event.change.kind(),
            magnitude = %event.magnitude,
            "{}",
            event.description
        );
    }
}

/// Hand events to `sink`, or to the tracing sink when none is given.
pub fn log_evolution_events(events: &[EvolutionEvent], sink: Option<&dyn EvolutionSink>) {
    let fallback = TracingEvolutionSink;
    let sink: &dyn EvolutionSink = sink.unwrap_or(&fallback);
    for event in events {
        sink.record(event);
    }
}
