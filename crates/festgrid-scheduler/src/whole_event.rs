//! Whole-event placement.
//!
//! Places entire events, rather than rounds, onto a single shared calendar.
//! Events are taken in score order and each keeps its own conducted window
//! if that window does not overlap one already accepted. Events that do not
//! fit are left out of the result. Students play no part here.

use fest_core::{EventWeights, TimeSlot};
use festgrid_state::Event;
use tracing::debug;

use crate::ranker::rank_events;

/// Candidate windows for an event. Currently just its own conducted span.
pub fn candidate_slots(event: &Event) -> Vec<TimeSlot> {
    vec![event.conducted_dates.as_slot()]
}

/// Does `slot` overlap any accepted window (half-open test)?
pub fn overlaps_any(slot: &TimeSlot, accepted: &[TimeSlot]) -> bool {
    accepted.iter().any(|s| slot.overlaps(s))
}

/// Rank `events` and give each that fits a `scheduled_time_slot`.
///
/// Returns only the placed events, in the order they were placed.
pub fn optimize_event_scheduling(events: Vec<Event>, weights: &EventWeights) -> Vec<Event> {
    let mut accepted: Vec<TimeSlot> = Vec::new();
    let mut placed = Vec::new();

    for mut event in rank_events(events, weights) {
        let chosen = candidate_slots(&event)
            .into_iter()
            .find(|slot| slot.is_valid() && !overlaps_any(slot, &accepted));
        match chosen {
            Some(slot) => {
                accepted.push(slot);
                event.scheduled_time_slot = Some(slot);
                placed.push(event);
            }
            None => debug!(event_id = %event.id, "event window overlaps an accepted event, skipped"),
        }
    }

    placed
}
