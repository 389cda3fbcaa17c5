//! Result and view types returned by the scheduling service.

use fest_core::DateRange;
use festgrid_state::{
    Event, EventStatus, Registration, RoundSchedule, SubEvent, SubEventSchedule, TargetedAudience,
};
use serde::{Deserialize, Serialize};

use crate::assigner::DegradedRound;
use crate::error::{SchedulerError, SchedulerResult};

/// Outcome of one `schedule_sub_events` run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleReport {
    pub event_id: String,
    /// Daily hours the run was asked to use.
    pub requested_daily_hours: f64,
    pub candidate_slots: usize,
    pub schedules: Vec<SubEventSchedule>,
    /// Rounds placed on fallback slots. These need manual review.
    pub degraded: Vec<DegradedRound>,
}

impl ScheduleReport {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    /// The schedules, or `SchedulingDegraded` if any round fell back.
    pub fn require_clean(self) -> SchedulerResult<Vec<SubEventSchedule>> {
        if self.is_degraded() {
            return Err(SchedulerError::SchedulingDegraded {
                count: self.degraded.len(),
            });
        }
        Ok(self.schedules)
    }
}

/// A stored schedule with the name of its sub-event resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedSchedule {
    pub schedule_id: String,
    /// `"Unknown"` when the sub-event no longer exists on the event.
    pub sub_event_name: String,
    #[serde(flatten)]
    pub schedule: SubEventSchedule,
}

/// Every stored schedule of an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventScheduleView {
    pub event_id: String,
    pub total_sub_events: usize,
    pub schedules: Vec<NamedSchedule>,
}

/// Partial update of a stored schedule. Omitted fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEdit {
    pub priority: Option<i64>,
    pub rounds: Option<Vec<RoundSchedule>>,
    pub daily_hours: Option<f64>,
}

pub const UNKNOWN_SUB_EVENT: &str = "Unknown";

/// Partial update of an event's details. Omitted fields stay as they are.
///
/// The id, organizer and enrolled students are not editable here. Supplying
/// `subEvents` replaces the whole list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub conducted_dates: Option<DateRange>,
    pub targeted_audience: Option<TargetedAudience>,
    pub maximum_students: Option<u32>,
    pub max_events_per_student: Option<u32>,
    pub status: Option<EventStatus>,
    pub sub_events: Option<Vec<SubEvent>>,
}

impl EventUpdate {
    /// Apply the given fields to `event`. New dates drop the placed window.
    pub fn apply(self, event: &mut Event) {
        if let Some(name) = self.name {
            event.name = name;
        }
        if let Some(description) = self.description {
            event.description = description;
        }
        if let Some(dates) = self.conducted_dates.filter(|d| *d != event.conducted_dates) {
            event.conducted_dates = dates;
            event.scheduled_time_slot = None;
        }
        if let Some(audience) = self.targeted_audience {
            event.targeted_audience = audience;
        }
        if let Some(maximum) = self.maximum_students {
            event.maximum_students = maximum;
        }
        if let Some(limit) = self.max_events_per_student {
            event.max_events_per_student = limit;
        }
        if let Some(status) = self.status {
            event.status = status;
        }
        if let Some(sub_events) = self.sub_events {
            event.sub_events = sub_events;
        }
    }
}

/// One of a student's registrations with the event it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredEvent {
    pub registration: Registration,
    pub event_name: String,
    pub conducted_dates: DateRange,
}

/// A student's active registrations, split at the time of the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRegistrations {
    /// Events starting after now, earliest first.
    pub upcoming_events: Vec<RegisteredEvent>,
    /// Events already started, earliest first.
    pub past_events: Vec<RegisteredEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(degraded: usize) -> ScheduleReport {
        let slot = fest_core::TimeSlot::new(
            "2025-03-10T09:00:00Z".parse().unwrap(),
            "2025-03-10T11:00:00Z".parse().unwrap(),
        )
        .unwrap();
        ScheduleReport {
            event_id: "ev".to_string(),
            requested_daily_hours: 8.0,
            candidate_slots: 4,
            schedules: vec![],
            degraded: (0..degraded)
                .map(|i| DegradedRound {
                    sub_event_id: "s".to_string(),
                    round_id: format!("r{i}"),
                    round_name: format!("Round {i}"),
                    time_slot: slot,
                })
                .collect(),
        }
    }

    #[test]
    fn clean_report_passes_require_clean() {
        assert!(report(0).require_clean().is_ok());
    }

    #[test]
    fn degraded_report_fails_require_clean() {
        let err = report(2).require_clean().unwrap_err();
        assert!(matches!(err, SchedulerError::SchedulingDegraded { count: 2 }));
    }

    #[test]
    fn edit_accepts_partial_json() {
        let edit: ScheduleEdit = serde_json::from_str(r#"{"priority": 4}"#).unwrap();
        assert_eq!(edit.priority, Some(4));
        assert!(edit.rounds.is_none());
        assert!(edit.daily_hours.is_none());
    }

    #[test]
    fn event_update_touches_only_given_fields() {
        let start = "2025-03-10T00:00:00Z".parse().unwrap();
        let dates = DateRange::new(start, "2025-03-11T00:00:00Z".parse().unwrap()).unwrap();
        let mut event = Event {
            id: "fest".to_string(),
            name: "Fest".to_string(),
            description: "old".to_string(),
            organizer: "org".to_string(),
            conducted_dates: dates,
            targeted_audience: TargetedAudience::default(),
            maximum_students: 100,
            max_events_per_student: 3,
            registered_students: Default::default(),
            sub_events: vec![],
            status: EventStatus::Upcoming,
            scheduled_time_slot: Some(dates.as_slot()),
        };

        let update: EventUpdate =
            serde_json::from_str(r#"{"description": "new", "maximumStudents": 5}"#).unwrap();
        update.apply(&mut event);
        assert_eq!(event.name, "Fest");
        assert_eq!(event.description, "new");
        assert_eq!(event.maximum_students, 5);
        assert!(event.scheduled_time_slot.is_some());

        let moved = DateRange::new(
            "2025-04-01T00:00:00Z".parse().unwrap(),
            "2025-04-02T00:00:00Z".parse().unwrap(),
        )
        .unwrap();
        EventUpdate {
            conducted_dates: Some(moved),
            ..Default::default()
        }
        .apply(&mut event);
        assert_eq!(event.conducted_dates, moved);
        assert!(event.scheduled_time_slot.is_none());
    }
}
