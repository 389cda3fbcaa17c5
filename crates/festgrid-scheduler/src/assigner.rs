//! Round assignment for one event.
//!
//! # Algorithm
//!
//! 1. Rank sub-events, then rank each sub-event's rounds. A sub-event with
//!    no rounds gets one synthetic "Default Round".
//! 2. For each round, scan the generated slots in chronological order and
//!    take the first one that is neither used in this run nor overlapping a
//!    commitment of any student in the sub-event's roster.
//! 3. If no generated slot fits, place the round on a fallback slot after
//!    every slot used so far and flag it.
//! 4. Collect one [`SubEventSchedule`] per sub-event. Nothing is written
//!    here; the caller persists the whole run at once.
//!
//! Each round moves `Unscheduled → Searching → Assigned` or, when the scan
//! comes up empty, `Searching → FallbackAssigned`.

use std::collections::{BTreeSet, HashMap};

use chrono::TimeDelta;
use fest_core::TimeSlot;
use festgrid_state::{
    Event, Placement, Round, RoundSchedule, StudentId, SubEvent, SubEventSchedule,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::conflict::{StudentSchedules, causes_clash, is_slot_used, update_student_schedules};
use crate::error::{SchedulerError, SchedulerResult};
use crate::ranker::{rank_rounds, rank_sub_events};
use crate::roster::Roster;
use crate::slots::{SlotPolicy, slots_for_event, validate_daily_hours};

pub const DEFAULT_ROUND_NAME: &str = "Default Round";

/// A round that only received a fallback slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DegradedRound {
    pub sub_event_id: String,
    pub round_id: String,
    pub round_name: String,
    pub time_slot: TimeSlot,
}

/// Output of one assignment run.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// One schedule per sub-event, in processing order.
    pub schedules: Vec<SubEventSchedule>,
    pub degraded: Vec<DegradedRound>,
    /// Number of generated candidate slots.
    pub candidate_slots: usize,
}

/// Bookkeeping owned by a single run and dropped with it.
#[derive(Debug, Default)]
struct RunState {
    used_slots: BTreeSet<TimeSlot>,
    student_schedules: StudentSchedules,
}

impl RunState {
    /// Accept `slot` for a round whose participants are `students`.
    fn commit(&mut self, slot: TimeSlot, students: &BTreeSet<StudentId>) {
        self.used_slots.insert(slot);
        update_student_schedules(slot, &mut self.student_schedules, students);
    }

    fn first_feasible(
        &self,
        candidates: &[TimeSlot],
        students: &BTreeSet<StudentId>,
    ) -> Option<TimeSlot> {
        candidates
            .iter()
            .find(|slot| {
                !is_slot_used(slot, &self.used_slots)
                    && !causes_clash(slot, &self.student_schedules, students)
            })
            .copied()
    }

    /// Overflow slot: `event_start + used × width`, moved later if needed so
    /// that it starts no earlier than the end of the latest used slot.
    fn fallback_slot(&self, event: &Event, width: TimeDelta) -> TimeSlot {
        let nominal = event.conducted_dates.start + width * self.used_slots.len() as i32;
        let after_used = self.used_slots.iter().map(|s| s.end).max();
        let start = match after_used {
            Some(end) if end > nominal => end,
            _ => nominal,
        };
        TimeSlot::starting_at(start, width)
    }
}

/// Rounds of a sub-event in processing order.
pub fn work_rounds(sub_event: &SubEvent) -> Vec<Round> {
    if sub_event.rounds.is_empty() {
        return vec![Round {
            id: format!("{}:default", sub_event.id),
            name: DEFAULT_ROUND_NAME.to_string(),
            sequence: None,
            scoring_categories: Vec::new(),
        }];
    }
    rank_rounds(&sub_event.rounds)
}

/// Assign every round of `event` to a slot.
///
/// `prior` maps sub-event id to the schedule stored by an earlier run or a
/// manual edit; only its priority is consulted.
pub fn assign(
    event: &Event,
    roster: &Roster,
    prior: &HashMap<String, SubEventSchedule>,
    daily_hours: f64,
    policy: &SlotPolicy,
) -> SchedulerResult<Assignment> {
    validate_daily_hours(daily_hours)?;
    if !event.conducted_dates.is_valid() {
        return Err(SchedulerError::InvalidScheduleConfig(format!(
            "event {} ends before it starts",
            event.id
        )));
    }

    let candidates = slots_for_event(&event.conducted_dates, daily_hours, policy)?;
    let span_days = event.conducted_dates.span_days();
    let effective_daily_hours =
        candidates.len() as f64 * policy.slot_hours() / span_days as f64;

    let mut run = RunState::default();
    let mut schedules = Vec::with_capacity(event.sub_events.len());
    let mut degraded = Vec::new();

    for ranked in rank_sub_events(&event.sub_events, prior) {
        let sub_event = ranked.sub_event;
        let students = roster.students_for(&sub_event.id);
        let mut rounds = Vec::new();

        for round in work_rounds(sub_event) {
            let (slot, placement) = match run.first_feasible(&candidates, students) {
                Some(slot) => (slot, Placement::Assigned),
                None => (run.fallback_slot(event, policy.slot_width), Placement::Fallback),
            };
            run.commit(slot, students);

            match placement {
                Placement::Assigned => debug!(
                    event_id = %event.id,
                    sub_event_id = %sub_event.id,
                    round = %round.name,
                    start = %slot.start,
                    "round assigned"
                ),
                Placement::Fallback => {
                    warn!(
                        event_id = %event.id,
                        sub_event_id = %sub_event.id,
                        round = %round.name,
                        start = %slot.start,
                        "no feasible slot, round placed on fallback slot"
                    );
                    degraded.push(DegradedRound {
                        sub_event_id: sub_event.id.clone(),
                        round_id: round.id.clone(),
                        round_name: round.name.clone(),
                        time_slot: slot,
                    });
                }
            }

            rounds.push(RoundSchedule {
                round_id: round.id,
                name: round.name,
                time_slot: slot,
                venue: sub_event.venue.clone(),
                placement,
            });
        }

        schedules.push(SubEventSchedule {
            event_id: event.id.clone(),
            sub_event_id: sub_event.id.clone(),
            priority: ranked.priority,
            rounds,
            daily_hours: effective_daily_hours,
        });
    }

    Ok(Assignment {
        schedules,
        degraded,
        candidate_slots: candidates.len(),
    })
}
