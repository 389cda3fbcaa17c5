//! Domain types for the festgrid state store.
//!
//! Events own their sub-events and rounds by composition. Schedules and
//! registrations are separate aggregates that point back at an event (and
//! sub-event) by id. Field names serialize in camelCase, which is the shape
//! the rest of the application reads.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use fest_core::{DateRange, TimeSlot};
use serde::{Deserialize, Serialize};

pub type EventId = String;
pub type SubEventId = String;
pub type RoundId = String;
pub type StudentId = String;
pub type UserId = String;
pub type RegistrationId = String;

/// Composite key of a sub-event schedule, `{event_id}:{sub_event_id}`.
pub type ScheduleId = String;

/// Joins the parts of a composite key. Event and sub-event ids may not
/// contain it.
pub const KEY_SEPARATOR: char = ':';

/// True if `key` is a composite key directly under `event_id`.
pub fn key_in_event(key: &str, event_id: &str) -> bool {
    key.strip_prefix(event_id)
        .and_then(|rest| rest.strip_prefix(KEY_SEPARATOR))
        .is_some_and(|rest| !rest.is_empty() && !rest.contains(KEY_SEPARATOR))
}

// ── Event ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: EventId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// User id of the organizer who owns this event.
    pub organizer: UserId,
    pub conducted_dates: DateRange,
    #[serde(default)]
    pub targeted_audience: TargetedAudience,
    #[serde(default = "default_maximum_students")]
    pub maximum_students: u32,
    #[serde(default = "default_max_events_per_student")]
    pub max_events_per_student: u32,
    #[serde(default)]
    pub registered_students: BTreeSet<StudentId>,
    #[serde(default)]
    pub sub_events: Vec<SubEvent>,
    #[serde(default)]
    pub status: EventStatus,
    /// Window assigned by whole-event scheduling, if the event was placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time_slot: Option<TimeSlot>,
}

fn default_maximum_students() -> u32 {
    100
}

fn default_max_events_per_student() -> u32 {
    3
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetedAudience {
    #[serde(default)]
    pub departments: Vec<String>,
    #[serde(default)]
    pub courses: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    Upcoming,
    Ongoing,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubEvent {
    #[serde(default)]
    pub id: SubEventId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default)]
    pub targeted_departments: Vec<String>,
    #[serde(default)]
    pub targeted_courses: Vec<String>,
    /// Empty means one implicit default round.
    #[serde(default)]
    pub rounds: Vec<Round>,
    /// Organizer priority, higher runs first. Unset falls back to round count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    #[serde(default)]
    pub id: RoundId,
    pub name: String,
    /// Explicit position within the sub-event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
    #[serde(default)]
    pub scoring_categories: Vec<String>,
}

impl Event {
    pub fn table_key(&self) -> String {
        self.id.clone()
    }

    pub fn sub_event(&self, sub_event_id: &str) -> Option<&SubEvent> {
        self.sub_events.iter().find(|s| s.id == sub_event_id)
    }

    pub fn sub_event_mut(&mut self, sub_event_id: &str) -> Option<&mut SubEvent> {
        self.sub_events.iter_mut().find(|s| s.id == sub_event_id)
    }

    /// Check the ids that end up in store keys and schedules.
    ///
    /// Event and sub-event ids must be non-empty and free of
    /// [`KEY_SEPARATOR`]. Sub-event ids are unique within the event and
    /// round ids are unique within their sub-event.
    pub fn validate_ids(&self) -> Result<(), String> {
        check_key_part("event", &self.id)?;
        let mut sub_ids = BTreeSet::new();
        for sub in &self.sub_events {
            check_key_part("sub-event", &sub.id)?;
            if !sub_ids.insert(sub.id.as_str()) {
                return Err(format!("duplicate sub-event id {:?}", sub.id));
            }
            let mut round_ids = BTreeSet::new();
            for round in &sub.rounds {
                if round.id.is_empty() {
                    return Err(format!("sub-event {:?} has a round without an id", sub.id));
                }
                if !round_ids.insert(round.id.as_str()) {
                    return Err(format!(
                        "duplicate round id {:?} in sub-event {:?}",
                        round.id, sub.id
                    ));
                }
            }
        }
        Ok(())
    }

    /// Fill blank ids on the event, its sub-events, and their rounds.
    pub fn assign_missing_ids(&mut self) {
        self.id = fest_core::or_new_id(&self.id);
        for sub in &mut self.sub_events {
            sub.id = fest_core::or_new_id(&sub.id);
            for round in &mut sub.rounds {
                round.id = fest_core::or_new_id(&round.id);
            }
        }
    }
}

fn check_key_part(kind: &str, id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("{kind} id must not be empty"));
    }
    if id.contains(KEY_SEPARATOR) {
        return Err(format!("{kind} id {id:?} must not contain {KEY_SEPARATOR:?}"));
    }
    Ok(())
}

// ── Registration ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: RegistrationId,
    pub student_id: StudentId,
    pub event_id: EventId,
    /// Sub-events the student signed up for. Empty means all of them.
    #[serde(default)]
    pub sub_event_ids: Vec<SubEventId>,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl Registration {
    pub fn key_for(event_id: &str, registration_id: &str) -> String {
        format!("{event_id}{KEY_SEPARATOR}{registration_id}")
    }

    pub fn table_key(&self) -> String {
        Self::key_for(&self.event_id, &self.id)
    }

    pub fn is_active(&self) -> bool {
        self.status != RegistrationStatus::Cancelled
    }
}

// ── Schedules ────────────────────────────────────────────────────

/// The scheduled slots of one sub-event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubEventSchedule {
    pub event_id: EventId,
    pub sub_event_id: SubEventId,
    pub priority: i64,
    pub rounds: Vec<RoundSchedule>,
    /// Working hours per day actually used by the run that produced this.
    pub daily_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoundSchedule {
    pub round_id: RoundId,
    pub name: String,
    pub time_slot: TimeSlot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default)]
    pub placement: Placement,
}

/// How a round obtained its slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// A generated slot that passed the clash and reuse checks.
    #[default]
    Assigned,
    /// Overflow placement after no generated slot fit. Needs review.
    Fallback,
}

impl SubEventSchedule {
    pub fn key_for(event_id: &str, sub_event_id: &str) -> ScheduleId {
        format!("{event_id}{KEY_SEPARATOR}{sub_event_id}")
    }

    pub fn table_key(&self) -> ScheduleId {
        Self::key_for(&self.event_id, &self.sub_event_id)
    }

    pub fn has_fallback(&self) -> bool {
        self.rounds.iter().any(|r| r.placement == Placement::Fallback)
    }
}
