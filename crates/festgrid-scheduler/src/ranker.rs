//! Work ordering.
//!
//! Three orderings live here and stay separate:
//! - **Sub-events**: descending priority, ties by name ascending.
//! - **Rounds within a sub-event**: ascending ordinal, stable.
//! - **Whole events**: descending weighted score (see [`score_event`]).
//!
//! All sorts are stable, so equal inputs always produce equal output.

use std::collections::HashMap;

use fest_core::EventWeights;
use festgrid_state::{Event, Round, SubEvent, SubEventSchedule};

/// A sub-event paired with the priority it is processed under.
#[derive(Debug, Clone, Copy)]
pub struct RankedSubEvent<'a> {
    pub sub_event: &'a SubEvent,
    pub priority: i64,
}

/// Priority of a sub-event for this run.
///
/// An existing schedule record carries the organizer's latest choice and wins.
/// Otherwise the sub-event's own priority applies, and failing that its round
/// count.
pub fn resolve_priority(sub_event: &SubEvent, prior: Option<&SubEventSchedule>) -> i64 {
    prior
        .map(|s| s.priority)
        .or(sub_event.priority)
        .unwrap_or(sub_event.rounds.len() as i64)
}

/// Order sub-events for processing.
///
/// `prior` maps sub-event id to its previously stored schedule, if any.
pub fn rank_sub_events<'a>(
    sub_events: &'a [SubEvent],
    prior: &HashMap<String, SubEventSchedule>,
) -> Vec<RankedSubEvent<'a>> {
    let mut ranked: Vec<RankedSubEvent<'a>> = sub_events
        .iter()
        .map(|sub_event| RankedSubEvent {
            sub_event,
            priority: resolve_priority(sub_event, prior.get(&sub_event.id)),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.sub_event.name.cmp(&b.sub_event.name))
    });
    ranked
}

/// Position of a round within its sub-event.
///
/// The explicit `sequence` is authoritative. Rounds without one fall back to
/// the number spelled by the digits in their name ("Round 2" → 2), or 0.
pub fn round_ordinal(round: &Round) -> u64 {
    match round.sequence {
        Some(seq) => u64::from(seq),
        None => ordinal_from_name(&round.name),
    }
}

/// Legacy ordinal: all ASCII digits of `name` read as one number, saturating.
pub fn ordinal_from_name(name: &str) -> u64 {
    name.bytes()
        .filter(u8::is_ascii_digit)
        .fold(0u64, |acc, b| {
            acc.saturating_mul(10).saturating_add(u64::from(b - b'0'))
        })
}

/// Order rounds ascending by ordinal, keeping insertion order on ties.
pub fn rank_rounds(rounds: &[Round]) -> Vec<Round> {
    let mut ranked = rounds.to_vec();
    ranked.sort_by_key(round_ordinal);
    ranked
}

/// Whole-event priority score.
pub fn score_event(event: &Event, weights: &EventWeights) -> f64 {
    weights.departments * event.targeted_audience.departments.len() as f64
        + weights.capacity * f64::from(event.maximum_students)
        + weights.complexity * event.sub_events.len() as f64
}

/// Order events by descending score; ties go to the earlier start, then the smaller id.
pub fn rank_events(events: Vec<Event>, weights: &EventWeights) -> Vec<Event> {
    let mut scored: Vec<(f64, Event)> = events
        .into_iter()
        .map(|e| (score_event(&e, weights), e))
        .collect();
    scored.sort_by(|(sa, a), (sb, b)| {
        sb.total_cmp(sa)
            .then_with(|| a.conducted_dates.start.cmp(&b.conducted_dates.start))
            .then_with(|| a.id.cmp(&b.id))
    });
    scored.into_iter().map(|(_, e)| e).collect()
}
